pub mod amount;
pub mod category;
pub mod currency;
pub mod report;

pub use amount::Amount;
pub use category::AmountCategory;
pub use currency::Currency;
pub use report::{
    ClassifiedAmount, ExtractionReport, FinalAmount, NoAmountsFound, NoAmountsReason,
    ReportStatus,
};
