use match_state::{MatchStateSnapshot, MatchStatus, OutcomeKey, RawLiveData, Score, Side, WorklistEntry};
use opportunity_engine::{Level, Opportunity, OpportunityScorer, Risk, Scenario};

fn entry(side: Option<Side>, pre_match_odd: f64) -> WorklistEntry {
    WorklistEntry {
        match_id:      "fx-2024".to_string(),
        home_team:     "Ajax".to_string(),
        away_team:     "Heerenveen".to_string(),
        league:        "Eredivisie".to_string(),
        kickoff:       Some("14:30".to_string()),
        favorite_side: side,
        pre_match_odd: Some(pre_match_odd),
        url:           None,
    }
}

fn snapshot(side: Side, score: (u32, u32), minute: u32, pre_match_odd: f64) -> MatchStateSnapshot {
    let mut snap = MatchStateSnapshot::not_ready(&entry(Some(side), pre_match_odd));
    snap.status = MatchStatus::Live;
    snap.score = Some(Score::new(score.0, score.1));
    snap.elapsed_minutes = Some(minute);
    snap
}

#[test]
fn scenario_a_home_favorite_one_down_at_70() {
    let opp = OpportunityScorer::default().score(&snapshot(Side::Home, (0, 1), 70, 1.45));
    assert_eq!(opp.score, 90);
    assert_eq!(opp.level, Level::Red);
    assert_eq!(opp.scenario, Scenario::FavoriteTrailing);
    assert_eq!(opp.risk, Risk::Medium);
    assert!(opp.suggested_action.as_deref().unwrap_or_default().contains("double-chance"));
    assert_eq!(opp.reasons[0], "Ajax trailing 0-1 (pre-match odd 1.45)");
}

#[test]
fn scenario_b_away_favorite_two_down_at_80() {
    let opp = OpportunityScorer::default().score(&snapshot(Side::Away, (2, 0), 80, 1.30));
    assert_eq!(opp.score, 75);
    assert_eq!(opp.level, Level::Orange);
    assert_eq!(opp.risk, Risk::High);
    assert_eq!(opp.scenario, Scenario::FavoriteTrailing);
    assert_eq!(opp.reasons[0], "Heerenveen trailing 2-0 (pre-match odd 1.3)");
}

#[test]
fn scenario_c_late_draw_with_drifted_odd() {
    let mut snap = snapshot(Side::Home, (1, 1), 70, 1.40);
    snap.live_odds.insert(OutcomeKey::HomeWin, 1.95);
    let opp = OpportunityScorer::default().score(&snap);
    assert_eq!(opp.score, 80);
    assert_eq!(opp.level, Level::Value);
    assert_eq!(opp.scenario, Scenario::LateDraw);
    assert_eq!(opp.risk, Risk::Medium);
}

#[test]
fn scenario_d_goalless_at_20_is_nothing() {
    let opp = OpportunityScorer::default().score(&snapshot(Side::Home, (0, 0), 20, 1.40));
    assert_eq!(opp.score, 0);
    assert_eq!(opp.level, Level::None);
    assert_eq!(opp.scenario, Scenario::None);
}

#[test]
fn non_live_statuses_always_score_zero() {
    let scorer = OpportunityScorer::default();
    for status in [
        MatchStatus::Upcoming,
        MatchStatus::Finished,
        MatchStatus::NotReady,
        MatchStatus::Unknown,
    ] {
        let mut snap = snapshot(Side::Home, (0, 3), 85, 1.2);
        snap.status = status;
        let opp = scorer.score(&snap);
        assert_eq!(opp.score, 0, "{status:?}");
        assert_eq!(opp.scenario, Scenario::None, "{status:?}");
    }
}

#[test]
fn unreadable_inputs_give_zero_verdict() {
    let scorer = OpportunityScorer::default();

    let mut snap = snapshot(Side::Home, (0, 1), 70, 1.45);
    snap.favorite_side = None;
    assert_eq!(scorer.score(&snap), Opportunity::none());

    let mut snap = snapshot(Side::Home, (0, 1), 70, 1.45);
    snap.score = None;
    assert_eq!(scorer.score(&snap), Opportunity::none());

    let mut snap = snapshot(Side::Home, (0, 1), 70, 1.45);
    snap.elapsed_minutes = None;
    assert_eq!(scorer.score(&snap), Opportunity::none());

    let mut snap = snapshot(Side::Home, (0, 1), 70, 1.45);
    snap.pre_match_odd = None;
    assert_eq!(scorer.score(&snap), Opportunity::none());

    // garbled page read goes through normalization without erroring
    let raw = RawLiveData {
        status: Some("LIVE".to_string()),
        score: Some("?-?".to_string()),
        clock: Some("--:--".to_string()),
        ..Default::default()
    };
    let snap = MatchStateSnapshot::normalize(&entry(Some(Side::Home), 1.45), &raw).unwrap();
    assert_eq!(scorer.score(&snap), Opportunity::none());
}

#[test]
fn scoring_is_idempotent() {
    let mut snap = snapshot(Side::Home, (1, 2), 58, 1.35);
    snap.live_odds.insert(OutcomeKey::HomeWin, 3.1);
    let scorer = OpportunityScorer::default();
    assert_eq!(scorer.score(&snap), scorer.score(&snap.clone()));
}

#[test]
fn risk_never_drops_as_gap_grows_late() {
    let scorer = OpportunityScorer::default();
    for minute in [60, 68, 75, 90, 96] {
        let one = scorer.score(&snapshot(Side::Home, (0, 1), minute, 1.5));
        let two = scorer.score(&snapshot(Side::Home, (0, 2), minute, 1.5));
        assert!(two.risk >= one.risk, "minute {minute}");
        assert_ne!(one.risk, Risk::High, "minute {minute}");
        assert_eq!(two.risk, Risk::High, "minute {minute}");
    }
}

#[test]
fn stoppage_minutes_are_taken_as_is() {
    let opp = OpportunityScorer::default().score(&snapshot(Side::Away, (1, 0), 94, 1.5));
    assert_eq!(opp.score, 90);
    assert_eq!(opp.suggested_action.as_deref(), Some("bet any goal before full time"));
}

#[test]
fn overflowing_goal_counts_do_not_panic() {
    let raw = RawLiveData {
        status: Some("LIVE".to_string()),
        score: Some("4294967295-1".to_string()),
        clock: Some("70:00".to_string()),
        ..Default::default()
    };
    let snap = MatchStateSnapshot::normalize(&entry(Some(Side::Home), 1.45), &raw).unwrap();
    assert_eq!(snap.score, None);
    assert_eq!(OpportunityScorer::default().score(&snap), Opportunity::none());

    // a hand-built snapshot past the parse guard still scores without overflow
    let opp = OpportunityScorer::default().score(&snapshot(Side::Home, (u32::MAX, u32::MAX), 70, 1.45));
    assert_eq!(opp.scenario, Scenario::LateDraw);
}
