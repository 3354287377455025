use pracht_alpha::error::PrachtError;

#[test]
fn wallbox_error_kinds() {
    assert!(matches!(
        PrachtError::connection("x"),
        PrachtError::Connection { .. }
    ));
    assert!(matches!(PrachtError::auth("x"), PrachtError::Auth { .. }));
    assert!(matches!(
        PrachtError::protocol("x"),
        PrachtError::Protocol { status: None, .. }
    ));
    assert!(matches!(
        PrachtError::protocol_status(502, "bad gateway"),
        PrachtError::Protocol {
            status: Some(502),
            ..
        }
    ));
}

#[test]
fn ambient_error_kinds() {
    assert!(matches!(
        PrachtError::config("x"),
        PrachtError::Config { .. }
    ));
    assert!(matches!(PrachtError::io("x"), PrachtError::Io { .. }));
    assert!(matches!(PrachtError::web("x"), PrachtError::Web { .. }));
    assert!(matches!(
        PrachtError::validation("f", "m"),
        PrachtError::Validation { .. }
    ));
    assert!(matches!(
        PrachtError::generic("x"),
        PrachtError::Generic { .. }
    ));
}

#[test]
fn predicates_are_exclusive() {
    let errors = [
        PrachtError::connection("x"),
        PrachtError::auth("x"),
        PrachtError::protocol("x"),
    ];
    for e in &errors {
        let hits = [e.is_connection(), e.is_auth(), e.is_protocol()]
            .iter()
            .filter(|b| **b)
            .count();
        assert_eq!(hits, 1, "{e}");
    }
    assert!(!PrachtError::generic("x").is_protocol());
}

#[test]
fn display_messages() {
    let e = PrachtError::validation("field", "bad");
    let s = format!("{}", e);
    assert!(s.contains("Validation error"));
    assert!(PrachtError::connection("timed out").to_string().starts_with("Connection error"));
}
