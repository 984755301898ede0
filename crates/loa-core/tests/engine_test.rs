use std::time::{Duration, Instant};

use loa_core::{
    ConfigError, ConfigSource, ControllerDirectory, EngineConfig, FlightFacts, FlightPlanState,
    LoaConfig, LoaEngine, OwnershipConfig,
};

struct StaticSource {
    rules: &'static str,
    ownership: &'static str,
}

impl ConfigSource for StaticSource {
    fn load_rules(&self) -> Result<LoaConfig, ConfigError> {
        Ok(serde_json::from_str(self.rules)?)
    }

    fn load_ownership(&self) -> Result<OwnershipConfig, ConfigError> {
        Ok(serde_json::from_str(self.ownership)?)
    }
}

struct StaticDirectory(Vec<String>);

impl StaticDirectory {
    fn new<const N: usize>(positions: [&str; N]) -> Self {
        Self(positions.iter().map(|p| p.to_string()).collect())
    }
}

impl ControllerDirectory for StaticDirectory {
    fn connected_positions(&self) -> Vec<String> {
        self.0.clone()
    }
}

const RULES: &str = r#"{
    "DKB": {
        "destinationLoas": [
            {"destinations": ["EDDF"], "waypoints": ["ANEKI"], "nextSectors": ["EDYY"], "xfl": 340, "copText": "ANEKI"}
        ]
    },
    "STG": {
        "departureLoas": [
            {"origins": ["EDDS"], "waypoints": ["ETASA"], "xfl": 240, "copText": "ETASA"}
        ]
    }
}"#;

const OWNERSHIP: &str = r#"{
    "ownership": {},
    "priority": {"DKB": ["CTR"]}
}"#;

fn engine() -> LoaEngine {
    let mut engine = LoaEngine::new(EngineConfig::default());
    let source = StaticSource {
        rules: RULES,
        ownership: OWNERSHIP,
    };
    engine.init("DKB", &source).unwrap();
    engine
}

fn arrival() -> FlightFacts {
    FlightFacts::new("DLH4CK", "EDDM", "EDDF")
        .with_route(["ANEKI"])
        .with_altitudes(34_000, 36_000)
}

#[test]
fn test_match_is_stable_within_ttl() {
    let mut engine = engine();
    let directory = StaticDirectory::new([]);
    let t0 = Instant::now();

    let first = engine.match_rule_at(&arrival(), &directory, t0).unwrap();
    let version = engine.world_version();
    let second = engine
        .match_rule_at(&arrival(), &directory, t0 + Duration::from_secs(5))
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(engine.world_version(), version);
    assert_eq!(engine.rule(first).unwrap().handoff_text, "ANEKI");
}

#[test]
fn test_recompute_after_ttl_gives_equivalent_result() {
    let mut engine = engine();
    let directory = StaticDirectory::new([]);
    let t0 = Instant::now();

    let first = engine.match_rule_at(&arrival(), &directory, t0).unwrap();
    let second = engine
        .match_rule_at(&arrival(), &directory, t0 + Duration::from_secs(11))
        .unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_reload_retires_outstanding_handles() {
    let mut engine = engine();
    let directory = StaticDirectory::new([]);
    let source = StaticSource {
        rules: RULES,
        ownership: OWNERSHIP,
    };
    let t0 = Instant::now();

    let old = engine.match_rule_at(&arrival(), &directory, t0).unwrap();
    engine.reload(&source).unwrap();

    assert!(engine.rule(old).is_none());

    let fresh = engine
        .match_rule_at(&arrival(), &directory, t0 + Duration::from_secs(1))
        .unwrap();
    assert_ne!(fresh.generation(), old.generation());
    assert_eq!(engine.rule(fresh).unwrap().handoff_text, "ANEKI");
}

#[test]
fn test_route_change_invalidates_without_version_bump() {
    let mut engine = engine();
    let directory = StaticDirectory::new([]);
    let t0 = Instant::now();

    assert!(engine.match_rule_at(&arrival(), &directory, t0).is_some());
    let version = engine.world_version();

    // Same aircraft, rerouted away from the agreement's waypoint.
    let rerouted = FlightFacts::new("DLH4CK", "EDDM", "EDDF")
        .with_route(["SPESA"])
        .with_altitudes(34_000, 36_000);
    let result = engine.match_rule_at(&rerouted, &directory, t0 + Duration::from_secs(1));

    assert!(result.is_none());
    assert_eq!(engine.world_version(), version);
}

#[test]
fn test_bad_config_keeps_previous_rules() {
    let mut engine = engine();
    let directory = StaticDirectory::new([]);
    let broken = StaticSource {
        rules: "{ not json",
        ownership: OWNERSHIP,
    };
    let t0 = Instant::now();

    let before = engine.match_rule_at(&arrival(), &directory, t0).unwrap();
    let version = engine.world_version();

    assert!(engine.reload(&broken).is_err());
    assert_eq!(engine.world_version(), version);
    assert!(engine.rule(before).is_some());
    let after = engine
        .match_rule_at(&arrival(), &directory, t0 + Duration::from_secs(1))
        .unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_watched_sector_handover_bumps_version() {
    let mut engine = engine();
    let t0 = Instant::now();

    // Baseline snapshot: nobody staffs CTR, so DKB resolves to nobody.
    assert!(!engine.notify_online_controllers_changed_at(&StaticDirectory::new([]), t0));
    let version = engine.world_version();

    let changed = engine.notify_online_controllers_changed_at(
        &StaticDirectory::new(["CTR"]),
        t0 + Duration::from_secs(1),
    );
    assert!(changed);
    assert_eq!(engine.world_version(), version + 1);
    assert_eq!(engine.resolve_sector_controller("DKB"), Some("CTR"));
}

#[test]
fn test_unrelated_controller_change_is_ignored() {
    let mut engine = engine();
    let t0 = Instant::now();

    engine.notify_online_controllers_changed_at(&StaticDirectory::new([]), t0);
    let version = engine.world_version();

    let changed = engine.notify_online_controllers_changed_at(
        &StaticDirectory::new(["EDYY"]),
        t0 + Duration::from_secs(1),
    );
    assert!(!changed);
    assert_eq!(engine.world_version(), version);
}

#[test]
fn test_dropped_plan_state_evicts_aircraft() {
    let mut engine = engine();
    let directory = StaticDirectory::new([]);
    let t0 = Instant::now();

    engine.match_rule_at(&arrival(), &directory, t0);
    engine.note_flight_plan_state("DLH4CK", FlightPlanState::Redundant);

    let irrelevant = arrival().with_state(FlightPlanState::NonConcerned);
    assert!(engine
        .match_rule_at(&irrelevant, &directory, t0 + Duration::from_secs(1))
        .is_none());
}

#[test]
fn test_failed_sector_change_keeps_previous_identity() {
    let mut engine = engine();
    let directory = StaticDirectory::new([]);
    let broken = StaticSource {
        rules: "{ not json",
        ownership: OWNERSHIP,
    };
    let t0 = Instant::now();

    let before = engine.match_rule_at(&arrival(), &directory, t0).unwrap();
    let version = engine.world_version();

    assert!(engine.notify_own_sector_changed("STG", &broken).is_err());

    // Identity and rule set roll back together, so the cached entry is
    // still the right answer for the sector the engine reports.
    assert_eq!(engine.my_sector(), "DKB");
    assert_eq!(engine.world_version(), version);
    let after = engine
        .match_rule_at(&arrival(), &directory, t0 + Duration::from_secs(1))
        .unwrap();
    assert_eq!(before, after);

    // A later change to a loadable source still goes through.
    let source = StaticSource {
        rules: RULES,
        ownership: OWNERSHIP,
    };
    assert!(engine.notify_own_sector_changed("STG", &source).unwrap());
    assert_eq!(engine.my_sector(), "STG");
}

#[test]
fn test_own_sector_change_reloads_rules() {
    let mut engine = engine();
    let source = StaticSource {
        rules: RULES,
        ownership: OWNERSHIP,
    };

    assert!(!engine.notify_own_sector_changed("dkb", &source).unwrap());
    assert!(engine.notify_own_sector_changed("STG", &source).unwrap());
    assert_eq!(engine.my_sector(), "STG");
    assert_eq!(engine.store().loaded_sectors(), &["STG".to_string()]);

    let directory = StaticDirectory::new([]);
    let departure = FlightFacts::new("DLH89A", "EDDS", "LFPG")
        .with_route(["ETASA"])
        .with_altitudes(10_000, 24_000);
    let handle = engine.match_rule(&departure, &directory).unwrap();
    assert_eq!(engine.rule(handle).unwrap().handoff_text, "ETASA");
}
