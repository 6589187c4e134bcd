use chrono::{DateTime, Utc};

pub const PLACEHOLDER: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentMethod {
    Cash,
    Card,
    /// Anything else the terminal recorded, kept verbatim.
    Other(String),
}

impl PaymentMethod {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Cash" => PaymentMethod::Cash,
            "Card" => PaymentMethod::Card,
            other => PaymentMethod::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Card => "Card",
            PaymentMethod::Other(s) if s.is_empty() => PLACEHOLDER,
            PaymentMethod::Other(s) => s,
        }
    }
}

/// One fare transaction as read from the `transactions` collection.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub id: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub fare_price: f64,
    pub payment_method: PaymentMethod,
    pub is_voided: bool,
    pub pick_up: Option<String>,
    pub drop_off: Option<String>,
    pub driver_name: Option<String>,
    pub invoice_num: Option<String>,
}

impl TransactionRecord {
    pub fn pick_up_or_placeholder(&self) -> &str {
        self.pick_up.as_deref().unwrap_or(PLACEHOLDER)
    }

    pub fn drop_off_or_placeholder(&self) -> &str {
        self.drop_off.as_deref().unwrap_or(PLACEHOLDER)
    }

    pub fn driver_or_placeholder(&self) -> &str {
        self.driver_name.as_deref().unwrap_or(PLACEHOLDER)
    }

    pub fn invoice_or_placeholder(&self) -> &str {
        self.invoice_num.as_deref().unwrap_or(PLACEHOLDER)
    }

    pub fn status_label(&self) -> &'static str {
        if self.is_voided {
            "Voided"
        } else {
            "Successful"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_method_is_case_sensitive() {
        assert_eq!(PaymentMethod::parse("Cash"), PaymentMethod::Cash);
        assert_eq!(PaymentMethod::parse("Card"), PaymentMethod::Card);
        assert_eq!(PaymentMethod::parse("cash"), PaymentMethod::Other("cash".to_string()));
        assert_eq!(PaymentMethod::parse("GCash").label(), "GCash");
        assert_eq!(PaymentMethod::parse("").label(), "N/A");
    }
}
