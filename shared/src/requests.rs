use serde::{Deserialize, Serialize};

use crate::sanitize::sanitize_html;
use crate::validation::{non_empty, Schema, ValidationErrors, Validator};

const NAME_MAX: usize = 255;
const DESCRIPTION_MAX: usize = 3000;

/// Largest imbalance tolerated between voucher debits and credits
const BALANCE_TOLERANCE: f64 = 0.005;

fn clean_description(description: &str) -> String {
    sanitize_html(description.trim())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BankRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_id: Option<String>,
}

impl Schema for BankRequest {
    fn parse(self) -> Result<Self, ValidationErrors> {
        let name = self.name.trim().to_string();
        Validator::new()
            .required("name", &name)
            .max_len("name", &name, NAME_MAX)
            .max_len("description", &self.description, DESCRIPTION_MAX)
            .finish()?;
        Ok(Self {
            name,
            description: clean_description(&self.description),
            media_id: non_empty(self.media_id),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BranchRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub description: String,
    pub branch_type: String,
    pub address: String,
    pub city: String,
    pub province: String,
    pub region: String,
    #[serde(default)]
    pub barangay: String,
    pub postal_code: String,
    pub country_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_id: Option<String>,
}

impl Schema for BranchRequest {
    fn parse(self) -> Result<Self, ValidationErrors> {
        let mut v = Validator::new();
        v.required("name", &self.name)
            .max_len("name", &self.name, NAME_MAX)
            .email("email", &self.email)
            .required("branch_type", &self.branch_type)
            .required("address", &self.address)
            .required("city", &self.city)
            .required("province", &self.province)
            .required("region", &self.region)
            .required("postal_code", &self.postal_code)
            .max_len("postal_code", &self.postal_code, 20)
            .required("country_code", &self.country_code)
            .max_len("country_code", &self.country_code, 3);
        if let Some(latitude) = self.latitude {
            v.range("latitude", latitude, -90.0, 90.0);
        }
        if let Some(longitude) = self.longitude {
            v.range("longitude", longitude, -180.0, 180.0);
        }
        v.finish()?;

        Ok(Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            description: clean_description(&self.description),
            country_code: self.country_code.trim().to_ascii_uppercase(),
            contact_number: non_empty(self.contact_number),
            media_id: non_empty(self.media_id),
            ..self
        })
    }
}

/// Bills-and-coins denominations. Both older form variants are folded into
/// this one shape: `value` must be positive and `country_code` is an
/// ISO 3166 code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BillsAndCoinRequest {
    pub name: String,
    pub value: f64,
    pub country_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_id: Option<String>,
}

impl Schema for BillsAndCoinRequest {
    fn parse(self) -> Result<Self, ValidationErrors> {
        let country_code = self.country_code.trim().to_ascii_uppercase();
        Validator::new()
            .required("name", &self.name)
            .max_len("name", &self.name, NAME_MAX)
            .positive("value", self.value)
            .required("country_code", &country_code)
            .custom(
                "country_code",
                country_code.is_empty()
                    || ((2..=3).contains(&country_code.len())
                        && country_code.chars().all(|c| c.is_ascii_alphabetic())),
                "Country code must be 2 or 3 letters",
            )
            .finish()?;
        Ok(Self {
            name: self.name.trim().to_string(),
            value: self.value,
            country_code,
            media_id: non_empty(self.media_id),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemberAssetRequest {
    pub member_profile_id: String,
    pub name: String,
    /// `YYYY-MM-DD` or RFC 3339, as typed into the date picker
    pub entry_date: String,
    #[serde(default)]
    pub description: String,
    pub cost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_id: Option<String>,
}

impl Schema for MemberAssetRequest {
    fn parse(self) -> Result<Self, ValidationErrors> {
        Validator::new()
            .required("member_profile_id", &self.member_profile_id)
            .required("name", &self.name)
            .max_len("name", &self.name, NAME_MAX)
            .date("entry_date", &self.entry_date)
            .non_negative("cost", self.cost)
            .max_len("description", &self.description, DESCRIPTION_MAX)
            .finish()?;
        Ok(Self {
            name: self.name.trim().to_string(),
            entry_date: self.entry_date.trim().to_string(),
            description: clean_description(&self.description),
            media_id: non_empty(self.media_id),
            ..self
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrganizationRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_number: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_id: Option<String>,
}

impl Schema for OrganizationRequest {
    fn parse(self) -> Result<Self, ValidationErrors> {
        let email = non_empty(self.email);
        let color = non_empty(self.color);
        let mut v = Validator::new();
        v.required("name", &self.name)
            .max_len("name", &self.name, NAME_MAX)
            .max_len("description", &self.description, DESCRIPTION_MAX);
        if let Some(email) = &email {
            v.email("email", email);
        }
        if let Some(color) = &color {
            v.custom(
                "color",
                color.len() == 7
                    && color.starts_with('#')
                    && color[1..].chars().all(|c| c.is_ascii_hexdigit()),
                "Color must be a hex value like #1f9d55",
            );
        }
        v.finish()?;

        Ok(Self {
            name: self.name.trim().to_string(),
            address: non_empty(self.address),
            email,
            contact_number: non_empty(self.contact_number),
            description: clean_description(&self.description),
            color,
            is_private: self.is_private,
            media_id: non_empty(self.media_id),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JournalVoucherEntryRequest {
    pub account_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_profile_id: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub debit: f64,
    #[serde(default)]
    pub credit: f64,
}

impl JournalVoucherEntryRequest {
    fn check(&self) -> Result<(), ValidationErrors> {
        Validator::new()
            .required("account_id", &self.account_id)
            .non_negative("debit", self.debit)
            .non_negative("credit", self.credit)
            .custom(
                "debit",
                (self.debit > 0.0) != (self.credit > 0.0),
                "Each line needs either a debit or a credit",
            )
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JournalVoucherRequest {
    pub voucher_number: String,
    pub date: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub entries: Vec<JournalVoucherEntryRequest>,
}

impl JournalVoucherRequest {
    pub fn total_debit(&self) -> f64 {
        self.entries.iter().map(|e| e.debit).sum()
    }

    pub fn total_credit(&self) -> f64 {
        self.entries.iter().map(|e| e.credit).sum()
    }
}

impl Schema for JournalVoucherRequest {
    fn parse(self) -> Result<Self, ValidationErrors> {
        let mut v = Validator::new();
        v.required("voucher_number", &self.voucher_number)
            .date("date", &self.date)
            .max_len("description", &self.description, DESCRIPTION_MAX)
            .custom("entries", !self.entries.is_empty(), "Add at least one entry");
        for (index, entry) in self.entries.iter().enumerate() {
            v.nested(&format!("entries.{}", index), entry.check());
        }
        if !self.entries.is_empty() {
            v.custom(
                "entries",
                (self.total_debit() - self.total_credit()).abs() < BALANCE_TOLERANCE,
                "Total debit must equal total credit",
            );
        }
        v.finish()?;

        Ok(Self {
            voucher_number: self.voucher_number.trim().to_string(),
            date: self.date.trim().to_string(),
            description: clean_description(&self.description),
            reference: non_empty(self.reference),
            entries: self
                .entries
                .into_iter()
                .map(|e| JournalVoucherEntryRequest {
                    member_profile_id: non_empty(e.member_profile_id),
                    description: e.description.trim().to_string(),
                    ..e
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_bank_requires_name() {
        let errors = BankRequest {
            name: "".to_string(),
            description: "desc".to_string(),
            media_id: None,
        }
        .parse()
        .unwrap_err();
        assert_eq!(errors.message_for("name"), Some("Name is required"));
    }

    #[test]
    fn test_bank_parse_sanitizes_and_omits_media() {
        let parsed = BankRequest {
            name: " BDO ".to_string(),
            description: "<p>desc</p><script>x()</script>".to_string(),
            media_id: Some("".to_string()),
        }
        .parse()
        .unwrap();

        assert_eq!(parsed.name, "BDO");
        assert_eq!(parsed.description, "<p>desc</p>");
        let body = serde_json::to_value(&parsed).unwrap();
        assert!(body.get("media_id").is_none());
    }

    #[rstest]
    #[case(0.0, "PH", Some("value"))]
    #[case(-5.0, "PH", Some("value"))]
    #[case(100.0, "", Some("country_code"))]
    #[case(100.0, "PHIL", Some("country_code"))]
    #[case(100.0, "P1", Some("country_code"))]
    #[case(100.0, "U-S", Some("country_code"))]
    #[case(100.0, "ph", None)]
    fn test_bills_and_coin_schema(
        #[case] value: f64,
        #[case] country_code: &str,
        #[case] failing_field: Option<&str>,
    ) {
        let result = BillsAndCoinRequest {
            name: "One hundred peso".to_string(),
            value,
            country_code: country_code.to_string(),
            media_id: None,
        }
        .parse();

        match failing_field {
            Some(field) => assert!(result.unwrap_err().has(field)),
            None => assert_eq!(result.unwrap().country_code, "PH"),
        }
    }

    #[test]
    fn test_member_asset_rejects_bad_date() {
        let errors = MemberAssetRequest {
            member_profile_id: "mp-1".to_string(),
            name: "Tricycle".to_string(),
            entry_date: "yesterday".to_string(),
            description: String::new(),
            cost: 85000.0,
            media_id: None,
        }
        .parse()
        .unwrap_err();
        assert!(errors.has("entry_date"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_branch_uppercases_country_and_checks_coordinates() {
        let request = BranchRequest {
            name: "Main".to_string(),
            email: "main@coop.ph".to_string(),
            branch_type: "main".to_string(),
            address: "1 Rizal St".to_string(),
            city: "Cebu".to_string(),
            province: "Cebu".to_string(),
            region: "VII".to_string(),
            postal_code: "6000".to_string(),
            country_code: "ph".to_string(),
            latitude: Some(10.3),
            longitude: Some(123.9),
            ..Default::default()
        };
        assert_eq!(request.clone().parse().unwrap().country_code, "PH");

        let errors = BranchRequest {
            latitude: Some(120.0),
            ..request
        }
        .parse()
        .unwrap_err();
        assert!(errors.has("latitude"));
    }

    #[test]
    fn test_organization_color_must_be_hex() {
        let errors = OrganizationRequest {
            name: "Kapatiran Coop".to_string(),
            color: Some("green".to_string()),
            ..Default::default()
        }
        .parse()
        .unwrap_err();
        assert!(errors.has("color"));
    }

    fn entry(debit: f64, credit: f64) -> JournalVoucherEntryRequest {
        JournalVoucherEntryRequest {
            account_id: "acc-cash".to_string(),
            debit,
            credit,
            ..Default::default()
        }
    }

    #[test]
    fn test_journal_voucher_must_balance() {
        let errors = JournalVoucherRequest {
            voucher_number: "JV-0001".to_string(),
            date: "2024-05-01".to_string(),
            entries: vec![entry(100.0, 0.0), entry(0.0, 90.0)],
            ..Default::default()
        }
        .parse()
        .unwrap_err();
        assert_eq!(
            errors.message_for("entries"),
            Some("Total debit must equal total credit")
        );
    }

    #[test]
    fn test_journal_voucher_line_needs_one_side() {
        let errors = JournalVoucherRequest {
            voucher_number: "JV-0002".to_string(),
            date: "2024-05-01".to_string(),
            entries: vec![entry(50.0, 50.0), entry(0.0, 0.0)],
            ..Default::default()
        }
        .parse()
        .unwrap_err();
        assert!(errors.has("entries.0.debit"));
        assert!(errors.has("entries.1.debit"));
    }

    #[test]
    fn test_balanced_journal_voucher_parses() {
        let parsed = JournalVoucherRequest {
            voucher_number: " JV-0003 ".to_string(),
            date: "2024-05-01".to_string(),
            entries: vec![entry(250.0, 0.0), entry(0.0, 250.0)],
            ..Default::default()
        }
        .parse()
        .unwrap();
        assert_eq!(parsed.voucher_number, "JV-0003");
        assert_eq!(parsed.total_debit(), 250.0);
    }
}
