pub mod authority;
pub mod cache;
pub mod coordination;
pub mod display;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod models;
pub mod store;

pub use authority::{OnlineSnapshot, SectorOwnershipTable};
pub use cache::{flight_signature, MatchCache};
pub use coordination::{CoordinationLedger, CoordinationState, CoordinationStatus};
pub use display::{
    cop_tag, destination_claimed, next_sector_tag, pel_tag, xfl_detailed_tag, xfl_tag, TagColor,
    TagValue,
};
pub use engine::{ConfigSource, ControllerDirectory, EngineConfig, LoaEngine};
pub use error::ConfigError;
pub use matcher::match_rule;
pub use models::{
    AirportFilter, CoordinationRule, FlightFacts, FlightPlanState, LoaConfig, OwnershipConfig,
    PlanType, RuleCategory, RuleSpec, SectorRuleSet, NO_AGREEMENT_TEXT,
};
pub use store::{RuleHandle, RuleStore};
