/// quick start - minimal example to get started
use installment_credit_rs::{
    CustomerProfile, LoanApplication, LoanService, Money, Rate, SafeTimeProvider, TimeSource,
};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut service = LoanService::in_memory();
    let time = SafeTimeProvider::new(TimeSource::System);

    // register a customer with a 10,000 credit line
    let customer = service.register_customer(CustomerProfile {
        name: "Ayse".to_string(),
        surname: "Yilmaz".to_string(),
        credit_limit: Money::from_major(10_000),
    })?;

    // borrow 1,000 at 10% flat over 6 months
    let loan = service.create_loan(
        LoanApplication {
            customer_id: customer.id,
            amount: Money::from_major(1_000),
            interest_rate: Rate::from_decimal(dec!(0.1)),
            installment_count: 6,
        },
        &time,
    )?;

    // pay the first installment (early payments earn a per-day discount)
    let result = service.apply_payment(loan.id, Money::from_major(200), &time)?;
    println!(
        "paid {} installment(s), spent {}",
        result.installments_paid, result.amount_spent
    );

    // print the loan view
    println!("{}", loan.to_json_pretty()?);

    Ok(())
}
