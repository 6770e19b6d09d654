//! Line store lifecycle through the public API: add, lookup, apply,
//! exempt, expire, remove.

mod common;

use common::{population, user};
use slircd_xline::XLineError;
use slircd_xline::state::UserTable;
use slircd_xline::xline::{
    ApplyPolicy, FactoryRegistry, GlineFactory, LineType, Origin, XLine, XLineFactory,
    XLineManager,
};
use std::sync::Arc;

const NOW: i64 = 1_700_000_000;

fn manager() -> XLineManager {
    XLineManager::new("irc.test")
}

#[test]
fn add_then_lookup_by_pattern_returns_same_line() {
    let mut mgr = manager();
    let mut users = UserTable::default();

    for (tag, mask) in [('G', "*@192.168.*"), ('Z', "10.0.0.0/8"), ('Q', "Bad*"), ('E', "ok@trusted.net")] {
        let line = mgr
            .factories()
            .generate(tag, NOW, 3600, "oper", "reason", mask)
            .unwrap();
        let expected = line.clone();
        mgr.add(line, Origin::Oper("oper"), &mut users, NOW).unwrap();

        let found = mgr
            .lookup_by_pattern(expected.line_type(), expected.pattern())
            .unwrap();
        assert_eq!(*found, expected);
    }
}

#[test]
fn second_add_fails_until_removed() {
    let mut mgr = manager();
    let mut users = UserTable::default();
    let gline = || XLine::gline(NOW, 0, "oper", "r", "*", "bad.host");

    mgr.add(gline(), Origin::Oper("oper"), &mut users, NOW).unwrap();
    let err = mgr.add(gline(), Origin::Oper("oper"), &mut users, NOW).unwrap_err();
    assert_eq!(err.to_string(), "G-Line for *@bad.host already exists");

    mgr.remove("*@bad.host", LineType::Gline, Origin::Oper("oper"), &mut users, false)
        .unwrap();
    // Removal is not repeatable.
    assert_eq!(
        mgr.remove("*@bad.host", LineType::Gline, Origin::Oper("oper"), &mut users, false),
        Err(XLineError::NotFound {
            line_type: LineType::Gline,
            mask: "*@bad.host".to_string()
        })
    );
    mgr.add(gline(), Origin::Oper("oper"), &mut users, NOW).unwrap();
}

#[test]
fn simulated_removal_changes_nothing() {
    let mut mgr = manager();
    let mut users = population(3);
    mgr.add(XLine::zline(NOW, 0, "o", "r", "10.0.0.0/8"), Origin::Oper("o"), &mut users, NOW)
        .unwrap();

    mgr.remove("10.0.0.0/8", LineType::Zline, Origin::Oper("o"), &mut users, true)
        .unwrap();
    assert_eq!(mgr.len(), 1);
    assert_eq!(mgr.pending_len(), 1);

    assert!(matches!(
        mgr.remove("10.9.0.0/16", LineType::Zline, Origin::Oper("o"), &mut users, true),
        Err(XLineError::NotFound { .. })
    ));
}

#[test]
fn matching_examples() {
    let mut mgr = manager();
    let mut users = UserTable::default();
    mgr.add(XLine::gline(NOW, 0, "o", "r", "*", "192.168.*"), Origin::Oper("o"), &mut users, NOW)
        .unwrap();
    let zline = mgr.factories().generate('Z', NOW, 0, "o", "r", "*@10.0.0.0/8").unwrap();
    mgr.add(zline, Origin::Oper("o"), &mut users, NOW).unwrap();
    mgr.add(XLine::qline(NOW, 0, "o", "r", "Bad*"), Origin::Oper("o"), &mut users, NOW)
        .unwrap();

    let lan = user("1", "someone", "192.168.1.5", "192.168.1.5");
    assert!(mgr.lookup_by_user(LineType::Gline, &lan).is_some());

    let inside = user("2", "x", "a.example", "10.5.5.5");
    let outside = user("3", "y", "b.example", "11.0.0.1");
    assert!(mgr.lookup_by_user(LineType::Zline, &inside).is_some());
    assert!(mgr.lookup_by_user(LineType::Zline, &outside).is_none());

    let bad = user("4", "BadGuy", "c.example", "192.0.2.1");
    let good = user("5", "GoodGuy", "c.example", "192.0.2.1");
    assert!(mgr.lookup_by_user(LineType::Qline, &bad).is_some());
    assert!(mgr.lookup_by_user(LineType::Qline, &good).is_none());
}

#[test]
fn pending_sweep_applies_exactly_the_matches() {
    let mut mgr = manager();
    let mut users = population(7);
    for i in 0..3 {
        users.insert(user(&format!("SPAM{i}"), &format!("spam{i}"), &format!("bot{i}.spam.net"), "192.0.2.1"));
    }
    assert_eq!(users.len(), 10);

    mgr.add(XLine::gline(NOW, 0, "o", "flood", "*", "*.spam.net"), Origin::Oper("o"), &mut users, NOW)
        .unwrap();

    assert_eq!(mgr.apply_pending(&mut users, ApplyPolicy::default()), 3);
    assert_eq!(mgr.pending_len(), 0);
    assert_eq!(users.len(), 7);

    let out = users.drain_disconnects();
    assert_eq!(out.len(), 3);
    assert!(out.iter().all(|d| d.quit_reason == "G-Lined: flood"));
    assert!(out.iter().all(|d| d.numeric.starts_with(":irc.test 465 spam")));

    // A second drain finds nothing left to do.
    assert_eq!(mgr.apply_pending(&mut users, ApplyPolicy::default()), 0);
}

#[test]
fn eline_shields_and_removal_restores_exposure() {
    let mut mgr = manager();
    let mut users = population(2);
    let target = user("99TARGET", "target", "vip.example", "10.1.1.1");
    users.insert(target.clone());

    mgr.add(XLine::eline(NOW, 0, "o", "vip", "*", "vip.example"), Origin::Oper("o"), &mut users, NOW)
        .unwrap();
    assert!(users.get("99TARGET").unwrap().exempt);

    mgr.add(XLine::gline(NOW, 0, "o", "ban", "*", "vip.example"), Origin::Oper("o"), &mut users, NOW)
        .unwrap();
    assert!(mgr.lookup_by_user(LineType::Gline, users.get("99TARGET").unwrap()).is_none());

    mgr.remove("*@vip.example", LineType::Eline, Origin::Oper("o"), &mut users, false)
        .unwrap();
    assert!(!users.get("99TARGET").unwrap().exempt);
    assert!(mgr.lookup_by_user(LineType::Gline, users.get("99TARGET").unwrap()).is_some());
}

#[test]
fn removing_one_eline_keeps_others_in_force() {
    let mut mgr = manager();
    let mut users = UserTable::default();
    users.insert(user("1", "n", "vip.example", "10.1.1.1"));

    mgr.add(XLine::eline(NOW, 0, "o", "a", "*", "vip.example"), Origin::Oper("o"), &mut users, NOW)
        .unwrap();
    mgr.add(XLine::eline(NOW, 0, "o", "b", "*", "10.1.0.0/16"), Origin::Oper("o"), &mut users, NOW)
        .unwrap();

    mgr.remove("*@vip.example", LineType::Eline, Origin::Oper("o"), &mut users, false)
        .unwrap();
    assert!(users.get("1").unwrap().exempt);
}

#[test]
fn expiry_boundaries() {
    let mut mgr = manager();
    let mut users = UserTable::default();
    mgr.add(XLine::kline(NOW, 60, "o", "temp", "*", "t.example"), Origin::Oper("o"), &mut users, NOW)
        .unwrap();
    mgr.add(XLine::kline(NOW, 0, "o", "perm", "*", "p.example"), Origin::Oper("o"), &mut users, NOW)
        .unwrap();

    assert!(mgr.expire_due(NOW + 59, &mut users).is_empty());
    let notices = mgr.expire_due(NOW + 60, &mut users);
    assert_eq!(
        notices,
        vec!["Removing expired K-Line *@t.example (set by o 60 seconds ago)".to_string()]
    );
    assert!(mgr.expire_due(i64::MAX, &mut users).is_empty());
    assert!(mgr.get(LineType::Kline, "*@p.example").is_some());
}

#[test]
fn expired_line_frees_its_key() {
    let mut mgr = manager();
    let mut users = UserTable::default();
    mgr.add(XLine::qline(NOW, 10, "o", "r", "Temp*"), Origin::Oper("o"), &mut users, NOW)
        .unwrap();
    mgr.expire_due(NOW + 10, &mut users);
    mgr.add(XLine::qline(NOW + 10, 10, "o", "r", "Temp*"), Origin::Oper("o"), &mut users, NOW + 10)
        .unwrap();
}

#[test]
fn stats_format() {
    let mut mgr = manager();
    let mut users = UserTable::default();
    mgr.add(XLine::gline(NOW, 3600, "oper", "go away", "*", "bad.host"), Origin::Oper("oper"), &mut users, NOW)
        .unwrap();

    assert_eq!(
        mgr.report_stats(LineType::Gline, 223, "viewer"),
        vec![format!(":irc.test 223 viewer :*@bad.host {NOW} 3600 oper :go away")]
    );
}

#[test]
fn factory_registry_guards() {
    let mut registry = FactoryRegistry::with_builtin();
    assert_eq!(
        registry.register(LineType::Gline, Arc::new(GlineFactory)),
        Err(XLineError::FactoryExists('G'))
    );

    let other: Arc<dyn XLineFactory> = Arc::new(GlineFactory);
    assert_eq!(
        registry.unregister(LineType::Gline, &other),
        Err(XLineError::FactoryMismatch('G'))
    );
    assert!(registry.generate('G', NOW, 0, "o", "r", "*@h").is_ok());
}

#[test]
fn unregistered_kind_cannot_be_added() {
    let mut mgr = manager();
    let mut users = UserTable::default();
    let qline_factory = Arc::clone(mgr.factories().get(LineType::Qline).unwrap());
    mgr.factories_mut()
        .unregister(LineType::Qline, &qline_factory)
        .unwrap();

    assert_eq!(
        mgr.factories().generate('Q', NOW, 0, "o", "r", "Nick"),
        Err(XLineError::UnregisteredKind('Q'))
    );
    assert_eq!(
        mgr.add(XLine::qline(NOW, 0, "o", "r", "Nick"), Origin::Oper("o"), &mut users, NOW),
        Err(XLineError::UnregisteredKind('Q'))
    );
}
