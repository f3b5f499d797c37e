use splitledger::domain::{
    transaction::{DebtEntry, TransactionUser},
    Amount, CurrencyCode, Relation, RelationHistoryEntry, TimeMs, TransactionId, TransactionLedger,
    UserId,
};
use splitledger::engine::{apply_plan, plan_settlement};

fn a(s: &str) -> Amount {
    Amount::from_str_canonical(s).unwrap()
}

fn usd() -> CurrencyCode {
    CurrencyCode::new("USD")
}

fn alice() -> UserId {
    UserId::new("alice")
}

fn bob() -> UserId {
    UserId::new("bob")
}

/// A two-party ledger where alice owes bob `owed` on the given day.
fn ledger(id: &str, owed: &str, day: i64) -> TransactionLedger {
    TransactionLedger {
        id: TransactionId::new(id),
        title: format!("Expense {}", id),
        group: None,
        currency: usd(),
        date: TimeMs::new(day),
        users: vec![
            TransactionUser::new(alice(), -a(owed)),
            TransactionUser::new(bob(), a(owed)),
        ],
        debts: vec![DebtEntry::new(alice(), bob(), a(owed))],
    }
}

fn relation_pair(ledgers: &[TransactionLedger]) -> (Relation, Relation) {
    let mut payer = Relation::new(alice(), bob());
    let mut payee = Relation::new(bob(), alice());
    for l in ledgers {
        let owed = l.outstanding_debt_of(&alice(), &bob());
        payer = payer.with_history(RelationHistoryEntry::from_transaction(
            l.id.clone(),
            l.title.clone(),
            -owed,
            usd(),
            l.date,
        ));
        payee = payee.with_history(RelationHistoryEntry::from_transaction(
            l.id.clone(),
            l.title.clone(),
            owed,
            usd(),
            l.date,
        ));
    }
    (payer, payee)
}

/// Three debts of $10 (day 1), $20 (day 2), $5 (day 3).
fn three_debts() -> Vec<TransactionLedger> {
    vec![
        ledger("t1", "10", 1),
        ledger("t2", "20", 2),
        ledger("t3", "5", 3),
    ]
}

#[test]
fn test_oldest_first_order_settles_first_two_of_three() {
    let ledgers = three_debts();
    let (payer, payee) = relation_pair(&ledgers);

    let plan = plan_settlement(&alice(), &bob(), a("25"), &usd(), &payer, &ledgers).unwrap();
    assert_eq!(
        plan.full
            .iter()
            .map(|p| p.transaction_id.as_str())
            .collect::<Vec<_>>(),
        vec!["t1", "t2"]
    );
    assert!(plan.partial.is_none());
    assert!(plan.leftover.is_zero());

    let outcome = apply_plan(&plan, "s1", payer, payee, ledgers, TimeMs::new(10));

    // The $5 debt is untouched: never among the returned ledgers.
    assert!(!outcome
        .ledgers
        .iter()
        .any(|l| l.id == TransactionId::new("t3")));
    for l in &outcome.ledgers {
        assert!(l.debt_between(&alice(), &bob()).unwrap().settled);
    }
    assert_eq!(outcome.payer_relation.balance(&usd()), a("-5"));
}

#[test]
fn test_partial_boundary_reduces_second_debt() {
    let ledgers = three_debts();
    let (payer, payee) = relation_pair(&ledgers);

    let plan = plan_settlement(&alice(), &bob(), a("15"), &usd(), &payer, &ledgers).unwrap();
    let outcome = apply_plan(&plan, "s1", payer, payee, ledgers, TimeMs::new(10));

    let t1 = outcome
        .ledgers
        .iter()
        .find(|l| l.id == TransactionId::new("t1"))
        .unwrap();
    assert!(t1.debt_between(&alice(), &bob()).unwrap().settled);

    let t2 = outcome
        .ledgers
        .iter()
        .find(|l| l.id == TransactionId::new("t2"))
        .unwrap();
    let t2_debt = t2.debt_between(&alice(), &bob()).unwrap();
    assert!(!t2_debt.settled);
    assert_eq!(t2_debt.amount, a("10"));

    assert!(!outcome
        .ledgers
        .iter()
        .any(|l| l.id == TransactionId::new("t3")));
}

#[test]
fn test_overpayment_records_reverse_credit() {
    let ledgers = vec![ledger("t1", "10", 1)];
    let (payer, payee) = relation_pair(&ledgers);

    let plan = plan_settlement(&alice(), &bob(), a("15"), &usd(), &payer, &ledgers).unwrap();
    assert_eq!(plan.leftover, a("5"));

    let outcome = apply_plan(&plan, "s1", payer, payee, ledgers, TimeMs::new(10));
    assert_eq!(outcome.payer_relation.balance(&usd()), a("5"));
    assert_eq!(outcome.payee_relation.balance(&usd()), a("-5"));

    let credit = outcome.payer_relation.history.last().unwrap();
    assert_eq!(credit.transaction_id, None);
    assert_eq!(credit.amount_change, a("5"));
    assert!(!credit.settled);
}

#[test]
fn test_conservation_holds_after_every_settlement_step() {
    for amount in ["1", "10", "15", "25", "30", "35", "100"] {
        let ledgers = three_debts();
        let (payer, payee) = relation_pair(&ledgers);
        let plan =
            plan_settlement(&alice(), &bob(), a(amount), &usd(), &payer, &ledgers).unwrap();
        let outcome = apply_plan(&plan, "s1", payer, payee, ledgers, TimeMs::new(10));
        for l in &outcome.ledgers {
            assert!(
                l.is_balanced(),
                "ledger {} unbalanced after settling {}",
                l.id,
                amount
            );
        }
    }
}

#[test]
fn test_symmetry_holds_after_every_settlement() {
    for amount in ["1", "10", "15", "25", "30", "35", "100"] {
        let ledgers = three_debts();
        let (payer, payee) = relation_pair(&ledgers);
        let plan =
            plan_settlement(&alice(), &bob(), a(amount), &usd(), &payer, &ledgers).unwrap();
        let outcome = apply_plan(&plan, "s1", payer, payee, ledgers, TimeMs::new(10));
        assert!(
            outcome.payer_relation.is_mirror_of(&outcome.payee_relation),
            "relations diverged after settling {}",
            amount
        );
    }
}

#[test]
fn test_double_apply_doubles_the_effect() {
    // Known gap: applying the same plan twice against the same snapshots
    // doubles the settlement. The store's version CAS is what protects the
    // persisted state; the pure engine offers no idempotence on its own.
    let ledgers = vec![ledger("t1", "10", 1)];
    let (payer, payee) = relation_pair(&ledgers);

    let plan = plan_settlement(&alice(), &bob(), a("10"), &usd(), &payer, &ledgers).unwrap();
    let once = apply_plan(
        &plan,
        "s1",
        payer.clone(),
        payee.clone(),
        ledgers.clone(),
        TimeMs::new(10),
    );
    assert_eq!(once.payer_relation.balance(&usd()), Amount::zero());

    let twice = apply_plan(
        &plan,
        "s2",
        once.payer_relation,
        once.payee_relation,
        ledgers,
        TimeMs::new(11),
    );
    // The doubled effect: alice's relation now shows bob owing her $10
    // even though only $10 of debt ever existed.
    assert_eq!(twice.payer_relation.balance(&usd()), a("10"));
}

#[test]
fn test_settled_transactions_excluded_from_next_walk() {
    let ledgers = three_debts();
    let (payer, payee) = relation_pair(&ledgers);

    let plan = plan_settlement(&alice(), &bob(), a("10"), &usd(), &payer, &ledgers).unwrap();
    let outcome = apply_plan(&plan, "s1", payer, payee, ledgers.clone(), TimeMs::new(10));

    // Merge updated ledgers over the originals, as a refetch would see.
    let refetched: Vec<TransactionLedger> = ledgers
        .into_iter()
        .map(|l| {
            outcome
                .ledgers
                .iter()
                .find(|u| u.id == l.id)
                .cloned()
                .unwrap_or(l)
        })
        .collect();

    let next = plan_settlement(
        &alice(),
        &bob(),
        a("25"),
        &usd(),
        &outcome.payer_relation,
        &refetched,
    )
    .unwrap();
    assert_eq!(
        next.full
            .iter()
            .map(|p| p.transaction_id.as_str())
            .collect::<Vec<_>>(),
        vec!["t2", "t3"]
    );
    assert!(next.leftover.is_zero());
}
