mod common;

use ccpi_cuts_core::*;
use common::*;

fn batch() -> Vec<TestEvent> {
    vec![
        signal_event(0),
        signal_event(1).with(branch::WEXP, 1600.0).weighted(0.5),
        signal_event(2).with(branch::PMU, 100.0).weighted(2.0),
        signal_event(3).with(branch::VTX_Z, 100.0),
        signal_event(4).with(branch::MINOS_QP, 0.2).weighted(0.25),
        signal_event(5).with(branch::N_ISO_PRONGS, 4.0),
    ]
}

fn classified(events: &[TestEvent]) -> Vec<Classification> {
    let det = Scripted::endpoint_at(&[0]);
    let cfg = CutCfg::default();
    events
        .iter()
        .map(|ev| {
            let ctx = CutContext::new(ev, &det, true, SignalDefinition::OnePi, &cfg);
            classify(&ctx, &default_cuts()).unwrap()
        })
        .collect()
}

fn table_for(events: &[TestEvent]) -> CutTable {
    let mut table = CutTable::new(&default_cuts());
    for (ev, c) in events.iter().zip(classified(events)) {
        table.tally(&c, ev.weight, true).unwrap();
    }
    table
}

#[test]
fn every_event_reaches_the_first_stage_and_counts_never_grow() {
    let events = batch();
    let table = table_for(&events);

    assert_eq!(table.events, events.len() as u64);
    assert_eq!(table.stage(CutId::NoCuts).unwrap().reached.raw, events.len() as u64);

    let reached: Vec<u64> = table.iter().map(|(_, s)| s.reached.raw).collect();
    assert!(reached.windows(2).all(|w| w[1] <= w[0]), "{reached:?}");
    for (_, s) in table.iter() {
        assert!(s.passed.raw <= s.reached.raw);
    }

    // vtx and minos failures drop two events before the pion stages
    assert_eq!(table.stage(CutId::AtLeastOnePionCandidateTrack).unwrap().reached.raw, 4);
    assert_eq!(table.signal.raw, 1);
    assert_eq!(table.sideband.raw, 1);
    assert_eq!(table.sideband.weighted, 0.5);
    assert_eq!(table.all_except.raw, 2);
}

#[test]
fn n_minus_one_counts_single_failures() {
    let table = table_for(&batch());
    // every event fails exactly one stage except the clean one
    assert_eq!(table.stage(CutId::Wexp).unwrap().n_minus_one.raw, 2);
    assert_eq!(table.stage(CutId::Pmu).unwrap().n_minus_one.raw, 2);
    assert_eq!(table.stage(CutId::Vtx).unwrap().n_minus_one.raw, 2);
    assert_eq!(table.stage(CutId::NoCuts).unwrap().n_minus_one.raw, 1);
}

#[test]
fn split_tables_merge_to_the_whole() {
    let events = batch();
    let whole = table_for(&events);

    let (a, b) = events.split_at(2);
    let mut left = table_for(a);
    let right = table_for(b);
    left.merge(&right).unwrap();
    assert_eq!(left, whole);

    let mut other_order = table_for(b);
    other_order.merge(&table_for(a)).unwrap();
    assert_eq!(other_order, whole);
}

#[test]
fn data_only_moves_raw_counts() {
    let mut table = CutTable::new(&[CutId::NoCuts, CutId::Pmu]);
    table.record(CutId::NoCuts, true, 3.0, false).unwrap();
    table.record(CutId::Pmu, false, 3.0, false).unwrap();
    table.record(CutId::NoCuts, true, 3.0, true).unwrap();

    let first = table.stage(CutId::NoCuts).unwrap();
    assert_eq!(first.reached.raw, 2);
    assert_eq!(first.reached.weighted, 3.0);
    let pmu = table.stage(CutId::Pmu).unwrap();
    assert_eq!(pmu.reached.raw, 1);
    assert_eq!(pmu.passed.raw, 0);
    assert_eq!(table.efficiency(CutId::Pmu), Some(0.0));
    assert_eq!(table.efficiency(CutId::NoCuts), Some(1.0));
}

#[test]
fn undefined_failures_are_counted_apart() {
    let mut ev = signal_event(7);
    ev.scalars.remove(branch::VTX_Y);
    let table = table_for(&[ev]);
    let vtx = table.stage(CutId::Vtx).unwrap();
    assert_eq!(vtx.reached.raw, 1);
    assert_eq!(vtx.passed.raw, 0);
    assert_eq!(vtx.undefined, 1);
}

#[test]
fn mismatched_tables_are_rejected() {
    let mut table = CutTable::new(&[CutId::NoCuts, CutId::Pmu]);
    let err = table.merge(&CutTable::new(&[CutId::Pmu, CutId::NoCuts])).unwrap_err();
    assert!(matches!(err, SelectError::TableMismatch(_)));

    let c = &classified(&[signal_event(1)])[0];
    assert!(table.tally(c, 1.0, true).is_err());
    assert!(table.record(CutId::Wexp, true, 1.0, true).is_err());
}

#[test]
fn candidate_counts_follow_surviving_tracks() {
    let table = table_for(&[signal_event(0), signal_event(1)]);
    assert_eq!(table.stage(CutId::Llr).unwrap().candidates, 2);
    assert_eq!(table.stage(CutId::Vtx).unwrap().candidates, 0);
}

#[test]
fn table_documents_are_checked_on_load() {
    let table = table_for(&batch());
    let doc = serde_json::to_value(&table).unwrap();
    let back: CutTable = serde_json::from_value(doc.clone()).unwrap();
    assert_eq!(back, table);

    let mut short = doc.clone();
    short["stages"] = serde_json::json!([]);
    let err = serde_json::from_value::<CutTable>(short).unwrap_err();
    assert!(err.to_string().contains("0 stages for 10 cuts"), "{err}");

    let mut doubled = doc;
    doubled["cuts"][1] = serde_json::json!("no_cuts");
    let err = serde_json::from_value::<CutTable>(doubled).unwrap_err();
    assert!(err.to_string().contains("no_cuts appears twice"), "{err}");
}

#[test]
fn fresh_tables_are_well_formed() {
    assert!(CutTable::new(&default_cuts()).validate().is_ok());
    assert!(CutTable::new(&[]).validate().is_ok());
}
