use chrono::Utc;
use mab_core::{
    extract_from_table, scenario_statistics, CaseKind, Extraction, ExtractionSource, Lender,
    LenderAmounts, LenderPanel, ResultsTable, RunTally, RunType, Scenario, ScenarioRecord,
    SessionId, SuccessPolicy, WaitReport, WaitVerdict, MAX_AMOUNT, MIN_AMOUNT,
};
use proptest::prelude::*;

fn any_amounts() -> impl Strategy<Value = LenderAmounts> {
    proptest::collection::vec(
        (proptest::sample::select(Lender::ALL.to_vec()), MIN_AMOUNT..=MAX_AMOUNT),
        0..20,
    )
    .prop_map(|entries| entries.into_iter().collect())
}

fn record_for(amounts: LenderAmounts, session: SessionId) -> ScenarioRecord {
    let scenario = Scenario::new("E-Single-030k", CaseKind::ESingle, 30_000, "T");
    let extraction = Extraction {
        rows_seen: amounts.len(),
        amounts,
        source: ExtractionSource::Table,
        rows_unmatched: 0,
        rows_rejected: 0,
    };
    let wait = WaitReport {
        budget_ms: 324_000,
        elapsed_ms: 60_000,
        polls: 3,
        verdict: WaitVerdict::Loaded,
        last_lender_count: 12,
        last_sigil_count: 15,
    };
    ScenarioRecord::extracted(
        session,
        &scenario,
        extraction,
        wait,
        false,
        SuccessPolicy::default().with_accept_partials(true),
    )
}

fn labels() -> impl Strategy<Value = String> {
    prop_oneof![
        proptest::sample::select(
            Lender::ALL
                .iter()
                .flat_map(|l| l.aliases().iter().map(|a| (*a).to_string()))
                .collect::<Vec<_>>()
        ),
        "[A-Za-z ]{1,20}",
    ]
}

proptest! {
    #[test]
    fn prop_rank_is_within_bounds(amounts in any_amounts()) {
        let stats = scenario_statistics(&amounts);
        match amounts.get(Lender::GenH) {
            Some(gen_h) => {
                prop_assert!(stats.gen_h_rank >= 1);
                prop_assert!(stats.gen_h_rank as usize <= amounts.len());
                let above = amounts.iter().filter(|(_, a)| *a > gen_h).count();
                prop_assert_eq!(stats.gen_h_rank as usize, above + 1);
            }
            None => prop_assert_eq!(stats.gen_h_rank, 0),
        }
    }

    #[test]
    fn prop_average_within_extremes(amounts in any_amounts()) {
        let stats = scenario_statistics(&amounts);
        if let (Some(min), Some(max)) = (
            amounts.iter().map(|(_, a)| a).min(),
            amounts.iter().map(|(_, a)| a).max(),
        ) {
            prop_assert!(stats.average >= min && stats.average <= max);
        }
    }

    #[test]
    fn prop_summary_invariants(batches in proptest::collection::vec(any_amounts(), 1..30)) {
        let session = SessionId::new();
        let mut tally = RunTally::new();
        for amounts in batches {
            tally.record(&record_for(amounts, session));
        }
        let summary = tally.summary(session, RunType::Full, Utc::now(), None);
        prop_assert!(summary.successful_scenarios <= summary.total_scenarios);
        let share = summary.rank_share;
        prop_assert!((share.top3 - (share.first + share.second + share.third)).abs() < 0.011);
        prop_assert!(share.top3 <= 100.0 + 0.02);
        prop_assert!(summary.average_gen_h_rank >= 0.0);
    }

    #[test]
    fn prop_extracted_lenders_are_canonical(
        rows in proptest::collection::vec((labels(), 0u64..3_000_000), 0..30)
    ) {
        let table = ResultsTable::new(
            vec!["Lender".into(), "Affordable".into()],
            rows.iter()
                .map(|(label, amount)| vec![label.clone(), format!("£{amount}")])
                .collect(),
        );
        let panel = LenderPanel::standard();
        let first = extract_from_table(panel, &table).unwrap();
        let second = extract_from_table(panel, &table).unwrap();
        prop_assert_eq!(&first, &second);
        for (lender, amount) in first.amounts.iter() {
            prop_assert!(Lender::ALL.contains(&lender));
            prop_assert!((MIN_AMOUNT..=MAX_AMOUNT).contains(&amount));
        }
    }
}
