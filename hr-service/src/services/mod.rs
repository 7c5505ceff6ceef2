pub mod database;
pub mod notifier;
pub mod salary_slip;

pub use database::{is_duplicate_key, HrDb};
pub use notifier::{
    FcmProvider, MockPushProvider, Notifier, ProviderError, ProviderResponse, PushMessage,
    PushProvider, TokenDelivery,
};
pub use salary_slip::{LocalSlipWriter, MockSlipGenerator, SlipGenerator};
