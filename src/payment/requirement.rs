//! Payment requirement: what a client must pay for a premium resource
//!
//! Built fresh for every gated request and never persisted.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// Micro-units per US dollar (USDC carries six decimals)
const MICROS_PER_USD: u64 = 1_000_000;

/// Exact USD price, stored in millionths of a dollar
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price {
    micros: u64,
}

impl Price {
    pub const fn from_micros(micros: u64) -> Self {
        Self { micros }
    }

    pub const fn micros(&self) -> u64 {
        self.micros
    }

    pub const fn is_zero(&self) -> bool {
        self.micros == 0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.micros / MICROS_PER_USD;
        let frac = format!("{:06}", self.micros % MICROS_PER_USD);
        let trimmed = frac.trim_end_matches('0');
        let frac = if trimmed.len() < 2 {
            &frac[..2]
        } else {
            trimmed
        };
        write!(f, "{}.{}", whole, frac)
    }
}

impl FromStr for Price {
    type Err = String;

    /// Accepts `1`, `0.01`, `$0.01`; at most six decimal places
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix('$').unwrap_or(s);
        if s.is_empty() {
            return Err("empty price".to_string());
        }

        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };

        if whole.is_empty() && frac.is_empty() {
            return Err(format!("invalid price: {}", s));
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(format!("invalid price: {}", s));
        }
        if frac.len() > 6 {
            return Err(format!("price has more than 6 decimal places: {}", s));
        }

        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| format!("price out of range: {}", s))?
        };
        let frac_micros: u64 = if frac.is_empty() {
            0
        } else {
            format!("{:0<6}", frac)
                .parse()
                .map_err(|_| format!("invalid price: {}", s))?
        };

        let micros = whole
            .checked_mul(MICROS_PER_USD)
            .and_then(|w| w.checked_add(frac_micros))
            .ok_or_else(|| format!("price out of range: {}", s))?;

        Ok(Self { micros })
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Structured payment instructions returned with a 402
///
/// Field order here is the wire order of the `PAYMENT-REQUIRED` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequirement {
    pub price: Price,
    pub currency: String,
    /// On-chain asset identifier
    pub token: String,
    /// Address that receives the payment
    pub recipient: String,
    /// Resource path being paid for
    pub endpoint: String,
    pub method: String,
    pub description: String,
    /// Verification service URL
    pub facilitator: String,
    pub instructions: String,
}

impl PaymentRequirement {
    /// Every field must be populated before a 402 goes out
    pub fn check_conformance(&self) -> Result<(), AppError> {
        if self.price.is_zero() {
            return Err(AppError::Conformance("price must be positive".to_string()));
        }

        let fields = [
            ("currency", &self.currency),
            ("token", &self.token),
            ("recipient", &self.recipient),
            ("endpoint", &self.endpoint),
            ("method", &self.method),
            ("description", &self.description),
            ("facilitator", &self.facilitator),
            ("instructions", &self.instructions),
        ];

        let missing: Vec<&str> = fields
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();

        if !missing.is_empty() {
            return Err(AppError::Conformance(format!(
                "missing fields: {}",
                missing.join(", ")
            )));
        }

        Ok(())
    }

    /// JSON form carried in both the header and the response body
    pub fn to_wire_json(&self) -> Result<String, AppError> {
        serde_json::to_string(self)
            .map_err(|e| AppError::Conformance(format!("failed to encode requirement: {}", e)))
    }
}

/// Operator-level payment settings shared by every premium route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentTerms {
    pub currency: String,
    pub token: String,
    pub recipient: String,
    pub facilitator: String,
}

impl PaymentTerms {
    /// Build the requirement for one request
    pub fn requirement_for(
        &self,
        price: Price,
        description: &str,
        endpoint: &str,
        method: &str,
    ) -> PaymentRequirement {
        let instructions = format!(
            "Authorize a payment of {} {} in {} to {}, then resend this {} request \
             with the signed authorization in the X-PAYMENT header.",
            price, self.currency, self.token, self.recipient, method
        );

        PaymentRequirement {
            price,
            currency: self.currency.clone(),
            token: self.token.clone(),
            recipient: self.recipient.clone(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
            description: description.to_string(),
            facilitator: self.facilitator.clone(),
            instructions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_terms() -> PaymentTerms {
        PaymentTerms {
            currency: "USD".to_string(),
            token: "eip155:84532/erc20:0x036CbD53842c5426634e7929541eC2318f3dCF7e".to_string(),
            recipient: "0x1111111111111111111111111111111111111111".to_string(),
            facilitator: "https://x402.org/facilitator".to_string(),
        }
    }

    #[test]
    fn test_price_parsing() {
        assert_eq!("0.01".parse::<Price>().unwrap().micros(), 10_000);
        assert_eq!("$1".parse::<Price>().unwrap().micros(), 1_000_000);
        assert_eq!("2.5".parse::<Price>().unwrap().micros(), 2_500_000);
        assert_eq!(".5".parse::<Price>().unwrap().micros(), 500_000);
        assert!("abc".parse::<Price>().is_err());
        assert!("0.0000001".parse::<Price>().is_err());
        assert!("-1".parse::<Price>().is_err());
        assert!("".parse::<Price>().is_err());
    }

    #[test]
    fn test_price_display() {
        assert_eq!(Price::from_micros(10_000).to_string(), "0.01");
        assert_eq!(Price::from_micros(1_000_000).to_string(), "1.00");
        assert_eq!(Price::from_micros(15_000).to_string(), "0.015");
        assert_eq!(Price::from_micros(2_500_000).to_string(), "2.50");
    }

    #[test]
    fn test_price_serializes_as_string() {
        let json = serde_json::to_string(&Price::from_micros(10_000)).unwrap();
        assert_eq!(json, "\"0.01\"");
        let back: Price = serde_json::from_str(&json).unwrap();
        assert_eq!(back.micros(), 10_000);
    }

    #[test]
    fn test_requirement_is_conformant() {
        let req = test_terms().requirement_for(
            Price::from_micros(10_000),
            "Full feedback export",
            "/export/evt_1",
            "GET",
        );
        assert!(req.check_conformance().is_ok());
        assert!(req.instructions.contains("X-PAYMENT"));
        assert!(req.instructions.contains("0.01"));
    }

    #[test]
    fn test_conformance_rejects_each_empty_field() {
        let base = test_terms().requirement_for(
            Price::from_micros(10_000),
            "Full feedback export",
            "/export/evt_1",
            "GET",
        );

        let mutations: [fn(&mut PaymentRequirement); 9] = [
            |r| r.currency.clear(),
            |r| r.token.clear(),
            |r| r.recipient = "  ".to_string(),
            |r| r.endpoint.clear(),
            |r| r.method.clear(),
            |r| r.description.clear(),
            |r| r.facilitator.clear(),
            |r| r.instructions.clear(),
            |r| r.price = Price::default(),
        ];

        for mutate in mutations {
            let mut req = base.clone();
            mutate(&mut req);
            assert!(matches!(
                req.check_conformance(),
                Err(AppError::Conformance(_))
            ));
        }
    }

    #[test]
    fn test_wire_json_field_order() {
        let req = test_terms().requirement_for(
            Price::from_micros(10_000),
            "Full feedback export",
            "/export/evt_1",
            "GET",
        );
        let json = req.to_wire_json().unwrap();
        assert!(json.starts_with("{\"price\":\"0.01\",\"currency\":\"USD\""));
    }
}
