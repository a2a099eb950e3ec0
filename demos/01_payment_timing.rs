/// payment timing - early discount and late penalty with controlled time
use chrono::{Duration, TimeZone, Utc};
use installment_credit_rs::{
    CustomerProfile, LoanApplication, LoanService, Money, Rate, SafeTimeProvider, TimeSource,
};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== payment timing example ===\n");

    // create controlled time for testing
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
    ));
    let controller = time.test_control().unwrap();

    let mut service = LoanService::in_memory();
    let customer = service.register_customer(CustomerProfile {
        name: "Mehmet".to_string(),
        surname: "Kaya".to_string(),
        credit_limit: Money::from_major(20_000),
    })?;

    let loan = service.create_loan(
        LoanApplication {
            customer_id: customer.id,
            amount: Money::from_major(1_000),
            interest_rate: Rate::from_decimal(dec!(0.1)),
            installment_count: 6,
        },
        &time,
    )?;
    println!("loan originated on {}", time.now().format("%Y-%m-%d"));
    for row in service.installments_for_loan(loan.id)? {
        println!("  due {}  amount {}", row.due_date, row.amount);
    }

    // pay on origination day: the 2024-02-01 installment is 17 days out,
    // so 0.001/day knocks 3.12 off the scheduled 183.33
    let early = service.apply_payment(loan.id, Money::from_major(200), &time)?;
    println!(
        "\nearly payment on {}: spent {} for {} installment(s)",
        time.now().format("%Y-%m-%d"),
        early.amount_spent,
        early.installments_paid
    );

    // jump past the next due date and pay 30 days late
    controller.advance(Duration::days(76));
    let late = service.apply_payment(loan.id, Money::from_major(200), &time)?;
    println!(
        "late payment on {}: spent {} for {} installment(s) (penalty included)",
        time.now().format("%Y-%m-%d"),
        late.amount_spent,
        late.installments_paid
    );

    Ok(())
}
