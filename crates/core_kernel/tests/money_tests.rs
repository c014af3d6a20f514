//! Unit tests for the Money module
//!
//! Covers creation, parsing, checked arithmetic and summation.

use core_kernel::{Money, Currency, MoneyError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

mod creation {
    use super::*;

    #[test]
    fn test_new_creates_money_with_correct_amount() {
        let m = Money::new(dec!(100.50), Currency::USD);
        assert_eq!(m.amount(), dec!(100.50));
        assert_eq!(m.currency(), Currency::USD);
    }

    #[test]
    fn test_zero_creates_zero_amount() {
        let m = Money::zero(Currency::EUR);
        assert!(m.is_zero());
        assert_eq!(m.currency(), Currency::EUR);
    }

    #[test]
    fn test_currency_parsing_is_case_insensitive() {
        assert_eq!("usd".parse::<Currency>().unwrap(), Currency::USD);
        assert!(matches!(
            "XYZ".parse::<Currency>(),
            Err(MoneyError::UnknownCurrency(_))
        ));
    }
}

mod arithmetic {
    use super::*;

    #[test]
    fn test_checked_add_and_sub() {
        let a = Money::new(dec!(100.00), Currency::USD);
        let b = Money::new(dec!(60.25), Currency::USD);

        assert_eq!(a.checked_add(&b).unwrap().amount(), dec!(160.25));
        assert_eq!(b.checked_sub(&a).unwrap().amount(), dec!(-39.75));
    }

    #[test]
    fn test_sum_of_empty_is_zero() {
        let total = Money::sum(&[], Currency::USD).unwrap();
        assert!(total.is_zero());
    }

    #[test]
    fn test_sum_rejects_mixed_currencies() {
        let items = [
            Money::new(dec!(1), Currency::USD),
            Money::new(dec!(1), Currency::GBP),
        ];
        assert!(matches!(
            Money::sum(&items, Currency::USD),
            Err(MoneyError::CurrencyMismatch(_, _))
        ));
    }

    #[test]
    fn test_overflow_is_reported() {
        let max = Money::new(Decimal::MAX, Currency::USD);
        assert_eq!(max.checked_add(&max), Err(MoneyError::Overflow));
    }

    #[test]
    fn test_negation() {
        let m = -Money::new(dec!(20), Currency::USD);
        assert_eq!(m.amount(), dec!(-20));
    }
}

mod display {
    use super::*;

    #[test]
    fn test_display_uses_currency_places() {
        let m = Money::new(dec!(1234.5), Currency::USD);
        assert_eq!(m.to_string(), "$ 1234.50");
    }
}
