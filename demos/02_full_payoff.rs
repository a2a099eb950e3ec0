/// full payoff - loan lifecycle from origination to capacity release
use chrono::{Duration, TimeZone, Utc};
use installment_credit_rs::{
    CustomerProfile, LoanApplication, LoanService, Money, Rate, SafeTimeProvider, TimeSource,
};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== full payoff example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
    ));
    let controller = time.test_control().unwrap();

    let mut service = LoanService::in_memory();

    // the boot roster: a few customers with varied credit lines
    let profiles = [
        ("Ayse", "Yilmaz", 10_000),
        ("Mehmet", "Kaya", 5_000),
        ("Fatma", "Demir", 25_000),
    ];
    let mut customers = Vec::new();
    for (name, surname, limit) in profiles {
        let customer = service.register_customer(CustomerProfile {
            name: name.to_string(),
            surname: surname.to_string(),
            credit_limit: Money::from_major(limit),
        })?;
        println!("registered {} {} with limit {}", name, surname, customer.credit_limit);
        customers.push(customer);
    }

    let borrower = &customers[0];
    let loan = service.create_loan(
        LoanApplication {
            customer_id: borrower.id,
            amount: Money::from_major(1_000),
            interest_rate: Rate::from_decimal(dec!(0.1)),
            installment_count: 6,
        },
        &time,
    )?;
    println!(
        "\nloan of {} originated, total with interest {}",
        loan.loan_amount, loan.total_amount
    );

    // pay everything due within the 3-month window, then jump ahead and
    // retire the rest
    let first = service.apply_payment(loan.id, Money::from_major(600), &time)?;
    println!(
        "first payment: {} installment(s), spent {}",
        first.installments_paid, first.amount_spent
    );

    controller.advance(Duration::days(90));
    let second = service.apply_payment(loan.id, Money::from_major(600), &time)?;
    println!(
        "second payment: {} installment(s), spent {}, fully paid: {}",
        second.installments_paid, second.amount_spent, second.loan_fully_paid
    );

    // the loan is closed and the credit line is whole again
    let loans = service.loans_for_customer(borrower.id)?;
    println!("\nloan is_paid: {}", loans[0].is_paid);

    println!("\nevents:");
    for event in service.take_events() {
        println!("  {:?}", event);
    }

    Ok(())
}
