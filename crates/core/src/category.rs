use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic role of an amount on a medical bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountCategory {
    TotalBill,
    Paid,
    Due,
    Discount,
    ConsultationFee,
    MedicineCost,
    TestCost,
    /// Anything the classifier could not place. Unknown labels deserialize here.
    #[serde(other)]
    Other,
}

impl AmountCategory {
    /// Every category, in classifier priority order (`Other` last).
    pub const ALL: [AmountCategory; 8] = [
        AmountCategory::TotalBill,
        AmountCategory::Paid,
        AmountCategory::Due,
        AmountCategory::Discount,
        AmountCategory::ConsultationFee,
        AmountCategory::MedicineCost,
        AmountCategory::TestCost,
        AmountCategory::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AmountCategory::TotalBill => "total_bill",
            AmountCategory::Paid => "paid",
            AmountCategory::Due => "due",
            AmountCategory::Discount => "discount",
            AmountCategory::ConsultationFee => "consultation_fee",
            AmountCategory::MedicineCost => "medicine_cost",
            AmountCategory::TestCost => "test_cost",
            AmountCategory::Other => "other",
        }
    }

    /// One-line description used when prompting a model.
    pub fn description(self) -> &'static str {
        match self {
            AmountCategory::TotalBill => "The total amount of the bill",
            AmountCategory::Paid => "Amount already paid",
            AmountCategory::Due => "Amount still due/outstanding",
            AmountCategory::Discount => "Discount amount",
            AmountCategory::ConsultationFee => "Doctor consultation fee",
            AmountCategory::MedicineCost => "Cost of medicines",
            AmountCategory::TestCost => "Cost of tests/procedures",
            AmountCategory::Other => "Other charges",
        }
    }

    /// Map a free-form label to a category. Never fails: unknown labels are `Other`.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.label() == label)
            .unwrap_or(AmountCategory::Other)
    }
}

impl fmt::Display for AmountCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
