mod common;

use ccpi_cuts_core::*;
use common::*;

fn ctx<'a>(
    ev: &'a TestEvent,
    det: &'a Scripted,
    cfg: &'a CutCfg,
    signal: SignalDefinition,
) -> CutContext<'a, TestEvent, Scripted> {
    CutContext::new(ev, det, true, signal, cfg)
}

#[test]
fn cut_names_round_trip_and_unknown_names_fail() {
    for cut in CutId::ALL {
        assert_eq!(cut.as_str().parse::<CutId>().unwrap(), cut);
    }
    let err = parse_cut_list(&["no_cuts", "vtx", "w_cut"]).unwrap_err();
    assert_eq!(err, SelectError::UnknownCut("w_cut".into()));
    assert!(err.is_configuration());
}

#[test]
fn registry_kinds() {
    assert!(CutId::Llr.is_exclusive());
    assert!(CutId::PionMichel.is_exclusive());
    assert!(!CutId::Wexp.is_exclusive());
    assert!(CutId::Precuts.spec().truth_only);
    assert!(!CutId::Vtx.spec().truth_only);
    assert!(truth_cuts().contains(&CutId::Precuts));
    assert!(!default_cuts().iter().any(|c| c.spec().truth_only));
}

#[test]
fn evaluating_twice_gives_the_same_result() {
    let ev = signal_event(1);
    let det = Scripted::endpoint_at(&[0]);
    let cfg = CutCfg::default();
    let c = ctx(&ev, &det, &cfg, SignalDefinition::OnePi);
    let sigs = Signatures::default();

    for cut in default_cuts() {
        let track = cut.is_exclusive().then_some(0);
        let a = c.evaluate(cut, &sigs, track).unwrap();
        let b = c.evaluate(cut, &sigs, track).unwrap();
        assert_eq!(a, b, "{cut}");
    }
}

#[test]
fn truth_cut_on_data_is_a_configuration_error() {
    let ev = signal_event(1).with(branch::TRUTH_GOOD_OBJECTS, 1.0);
    let det = Scripted::default();
    let cfg = CutCfg::default();
    let c = CutContext::new(&ev, &det, false, SignalDefinition::OnePi, &cfg);
    let err = c.evaluate(CutId::GoodObjects, &Signatures::default(), None).unwrap_err();
    assert_eq!(err, SelectError::TruthOnlyOnData(CutId::GoodObjects));
}

#[test]
fn precuts_need_all_four_truth_flags() {
    let cfg = CutCfg::default();
    let det = Scripted::default();
    let ev = signal_event(1)
        .with(branch::TRUTH_GOOD_OBJECTS, 1.0)
        .with(branch::TRUTH_GOOD_VERTEX, 1.0)
        .with(branch::TRUTH_FIDUCIAL, 1.0)
        .with(branch::TRUTH_MINOS_ACTIVITY, 1.0);
    let c = ctx(&ev, &det, &cfg, SignalDefinition::OnePi);
    assert!(c.evaluate(CutId::Precuts, &Signatures::default(), None).unwrap().outcome.passed());

    let ev = ev.with(branch::TRUTH_FIDUCIAL, 0.0);
    let c = ctx(&ev, &det, &cfg, SignalDefinition::OnePi);
    let eval = c.evaluate(CutId::Precuts, &Signatures::default(), None).unwrap();
    assert_eq!(eval.outcome, CutOutcome::FAIL);
}

#[test]
fn exclusive_cut_needs_a_valid_track() {
    let ev = signal_event(1);
    let det = Scripted::default();
    let cfg = CutCfg::default();
    let c = ctx(&ev, &det, &cfg, SignalDefinition::OnePi);

    let err = c.evaluate(CutId::Llr, &Signatures::default(), None).unwrap_err();
    assert_eq!(err, SelectError::MissingTrackIndex(CutId::Llr));

    let err = c.evaluate(CutId::Llr, &Signatures::default(), Some(2)).unwrap_err();
    assert!(err.is_consistency());
}

#[test]
fn missing_observable_is_undefined_not_an_error() {
    let mut ev = signal_event(1);
    ev.scalars.remove(branch::VTX_Z);
    let det = Scripted::default();
    let cfg = CutCfg::default();
    let c = ctx(&ev, &det, &cfg, SignalDefinition::OnePi);

    let out = c.evaluate(CutId::Vtx, &Signatures::default(), None).unwrap().outcome;
    assert_eq!(out, CutOutcome::Undefined);
    assert!(!out.passed());

    let ev = signal_event(1).with(branch::PMU, f64::NAN);
    let c = ctx(&ev, &det, &cfg, SignalDefinition::OnePi);
    assert!(c.evaluate(CutId::Pmu, &Signatures::default(), None).unwrap().outcome.is_undefined());
}

#[test]
fn w_cut_reports_the_failing_side() {
    let det = Scripted::default();
    let cfg = CutCfg::default();

    let ev = signal_event(1).with(branch::WEXP, 1600.0);
    let c = ctx(&ev, &det, &cfg, SignalDefinition::OnePi);
    assert_eq!(
        c.evaluate(CutId::Wexp, &Signatures::default(), None).unwrap().outcome,
        CutOutcome::Fail(Rejection::above(1600.0))
    );

    let ev = signal_event(1).with(branch::WEXP, -50.0);
    let c = ctx(&ev, &det, &cfg, SignalDefinition::OnePi);
    assert_eq!(
        c.evaluate(CutId::Wexp, &Signatures::default(), None).unwrap().outcome,
        CutOutcome::Fail(Rejection::below(-50.0))
    );

    // 1600 is inside the multi-pion window and unbounded without a W cut.
    let ev = signal_event(1).with(branch::WEXP, 1600.0);
    for signal in [SignalDefinition::NPi, SignalDefinition::NPiNoW, SignalDefinition::OnePiNoW] {
        let c = ctx(&ev, &det, &cfg, signal);
        assert!(c.evaluate(CutId::Wexp, &Signatures::default(), None).unwrap().outcome.passed());
    }
}

#[test]
fn hexagon_boundaries() {
    assert!(in_hexagon(0.0, 0.0, 850.0));
    assert!(in_hexagon(849.0, 0.0, 850.0));
    assert!(!in_hexagon(851.0, 0.0, 850.0));
    // Corner of the hexagon is at y = 2a/sqrt(3) on the y axis.
    assert!(in_hexagon(0.0, 970.0, 850.0));
    assert!(!in_hexagon(0.0, 990.0, 850.0));
    assert!(!in_hexagon(800.0, 700.0, 850.0));
}

#[test]
fn michel_cut_runs_detectors_once_and_keeps_known_signatures() {
    let ev = signal_event(1);
    let det = Scripted::endpoint_at(&[0]);
    let cfg = CutCfg::default();
    let c = ctx(&ev, &det, &cfg, SignalDefinition::OnePi);

    let mut known = Signatures::default();
    known.endpoint.insert(1, michel(5.0));
    known.endpoint.insert(0, michel(99.0));

    let eval = c.evaluate(CutId::AtLeastOneMichel, &known, None).unwrap();
    assert!(eval.outcome.passed());
    assert!(eval.signatures.detected);
    assert_eq!(eval.signatures.endpoint.len(), 2);
    assert_eq!(eval.signatures.endpoint[&0].energy, 99.0);
    assert_eq!(det.calls.get(), 1);

    let again = c.evaluate(CutId::AtLeastOneMichel, &eval.signatures, None).unwrap();
    assert_eq!(again, eval);
    assert_eq!(det.calls.get(), 1);
}

#[test]
fn michel_cut_fails_without_signatures() {
    let ev = signal_event(1);
    let det = Scripted::default();
    let cfg = CutCfg::default();
    let c = ctx(&ev, &det, &cfg, SignalDefinition::OnePi);
    let eval = c.evaluate(CutId::AtLeastOneMichel, &Signatures::default(), None).unwrap();
    assert_eq!(eval.outcome, CutOutcome::FAIL);
    assert!(eval.signatures.detected);
    assert!(eval.signatures.is_empty());
}

#[test]
fn detector_returning_foreign_track_is_a_consistency_error() {
    let ev = signal_event(4);
    let det = Scripted::endpoint_at(&[7]);
    let cfg = CutCfg::default();
    let c = ctx(&ev, &det, &cfg, SignalDefinition::OnePi);
    let err = c.evaluate(CutId::AtLeastOneMichel, &Signatures::default(), None).unwrap_err();
    assert_eq!(
        err,
        SelectError::TrackOutOfRange {
            entry: 4,
            index: 7,
            track_count: 2,
            origin: IndexSource::Endpoint,
        }
    );
}

#[test]
fn pion_michel_cut_reads_both_signature_sources() {
    let ev = TestEvent::new(1, 3);
    let det = Scripted::default();
    let cfg = CutCfg::default();
    let c = ctx(&ev, &det, &cfg, SignalDefinition::OnePiNoW);

    let mut sigs = Signatures::default();
    sigs.endpoint.insert(0, michel(20.0));
    sigs.vertex = VertexSignature::new(2, michel(40.0));

    let passed: Vec<bool> = (0..3)
        .map(|t| c.evaluate(CutId::PionMichel, &sigs, Some(t)).unwrap().outcome.passed())
        .collect();
    assert_eq!(passed, vec![true, false, true]);
}

#[test]
fn cfg_fills_defaults_from_partial_document() {
    let doc = r#"{ "pmu_min": 2000.0, "iso_prongs_max": 3 }"#;
    let cfg: CutCfg = serde_json::from_str(doc).unwrap();
    assert_eq!(cfg.pmu_min, 2000.0);
    assert_eq!(cfg.iso_prongs_max, 3);
    assert_eq!(cfg.pmu_max, CutCfg::default().pmu_max);
    assert_eq!(cfg.one_pi_sideband, CutCfg::default().one_pi_sideband);
}
