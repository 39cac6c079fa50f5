mod common;

use std::cell::Cell;

use anyhow::{Context, bail};
use common::{Case, case, granting, init_logging, value_of};
use warden_core::Value;
use warden_guard::{Guard, GuardError, InvocationError, MethodId, MethodPolicy, PolicyRegistry, SecurityConfig};

fn case_service() -> anyhow::Result<PolicyRegistry> {
    Ok(PolicyRegistry::builder()
        .register(
            "CaseService::view",
            MethodPolicy::new().parameter(0, "c", ["case:view:c.county"])?,
        )?
        .register(
            "CaseService::list",
            MethodPolicy::new().parameter(0, "cases", ["case:view:cases.county"])?,
        )?
        .register(
            "CaseService::review_batch",
            MethodPolicy::new().parameter(0, "batch", ["case:view:batch.cases.items.flatten()"])?,
        )?
        .register(
            "CaseService::search",
            MethodPolicy::new().returns(["case:view:result.county"])?,
        )?
        .build())
}

fn enforcing_guard() -> anyhow::Result<Guard> {
    init_logging();
    Ok(Guard::new(case_service()?, &SecurityConfig::default()))
}

#[test]
fn scenario_a_granted_scalar_proceeds_unmodified() -> anyhow::Result<()> {
    let guard = enforcing_guard()?;
    let subject = granting(&["case:view:Yolo"]);
    let ran = Cell::new(0);

    let original = value_of(&case(1, "Yolo"));
    let mut args = vec![Some(original.clone())];
    let result = guard.invoke(&subject, &MethodId::new("CaseService::view"), &mut args, |args| {
        ran.set(ran.get() + 1);
        Ok::<_, anyhow::Error>(args[0].clone())
    });

    let Ok(returned) = result else {
        bail!("scenario A should be allowed");
    };
    assert_eq!(ran.get(), 1);
    assert_eq!(returned, Some(original.clone()));
    assert_eq!(args, vec![Some(original)]);
    assert_eq!(subject.calls(), 1);
    Ok(())
}

#[test]
fn scenario_b_missing_grant_denies_before_the_body_runs() -> anyhow::Result<()> {
    let guard = enforcing_guard()?;
    let subject = granting(&["case:view:Madera"]);
    let ran = Cell::new(0);

    let mut args = vec![Some(value_of(&case(1, "Yolo")))];
    let err = guard
        .invoke(&subject, &MethodId::new("CaseService::view"), &mut args, |_| {
            ran.set(ran.get() + 1);
            Ok::<_, anyhow::Error>(None)
        })
        .err()
        .context("scenario B should be denied")?;

    assert_eq!(ran.get(), 0);
    let denial = err.denial().context("expected an access denial")?;
    assert_eq!(denial.permission, "case:view");
    assert!(err.to_string().contains("case:view"));
    Ok(())
}

#[test]
fn scenario_c_collection_is_narrowed_without_error() -> anyhow::Result<()> {
    let guard = enforcing_guard()?;
    let subject = granting(&["case:view:Yolo"]);

    let cases = vec![case(1, "Yolo"), case(2, "Madera"), case(3, "Yolo")];
    let mut args = vec![Some(value_of(&cases))];

    let seen = guard
        .invoke(&subject, &MethodId::new("CaseService::list"), &mut args, |args| {
            let visible: Vec<Case> = args[0].clone().unwrap_or_default().into_typed()?;
            Ok::<_, anyhow::Error>(Some(value_of(&visible)))
        })
        .map_err(|e| anyhow::anyhow!("scenario C should not fail: {e}"))?
        .context("operation returned a value")?;

    let seen: Vec<Case> = seen.into_typed()?;
    assert_eq!(seen, vec![case(1, "Yolo"), case(3, "Yolo")]);

    // The caller's arguments are narrowed too.
    let narrowed: Vec<Case> = args[0].clone().unwrap_or_default().into_typed()?;
    assert_eq!(narrowed, seen);

    // One projected set, one subject call.
    assert_eq!(subject.calls(), 1);
    Ok(())
}

#[test]
fn scenario_d_nested_scalar_values_are_all_or_nothing() -> anyhow::Result<()> {
    let guard = enforcing_guard()?;
    let subject = granting(&["case:view:Yolo"]);
    let ran = Cell::new(false);

    let batch = Value::record([(
        "cases",
        Value::List(vec![
            Value::record([("items", Value::List(vec![Value::from("Yolo"), Value::from("Madera")]))]),
            Value::record([("items", Value::List(vec![Value::from("Yolo")]))]),
        ]),
    )]);
    let mut args = vec![Some(batch.clone())];

    let err = guard
        .invoke(&subject, &MethodId::new("CaseService::review_batch"), &mut args, |_| {
            ran.set(true);
            Ok::<_, anyhow::Error>(None)
        })
        .err()
        .context("scenario D should be denied")?;

    assert!(err.is_access_denied());
    assert!(!ran.get());
    // Yolo passes, Madera stops the check.
    assert_eq!(subject.calls(), 2);
    // Scalar checks never touch their input.
    assert_eq!(args, vec![Some(batch)]);
    Ok(())
}

#[test]
fn unshrunk_candidate_set_leaves_collection_untouched() -> anyhow::Result<()> {
    let guard = enforcing_guard()?;
    let subject = granting(&["case:view:Yolo,Madera"]);

    let original = value_of(&vec![case(1, "Yolo"), case(2, "Madera"), case(3, "Yolo")]);
    let mut args = vec![Some(original.clone())];

    guard
        .invoke(&subject, &MethodId::new("CaseService::list"), &mut args, |_| {
            Ok::<_, anyhow::Error>(None)
        })
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    assert_eq!(args, vec![Some(original)]);
    Ok(())
}

#[test]
fn disabled_toggle_means_zero_subject_calls() -> anyhow::Result<()> {
    let guard = Guard::new(case_service()?, &SecurityConfig::disabled());
    let subject = granting(&[]);

    let list = value_of(&vec![case(1, "Yolo"), case(2, "Madera")]);
    let mut args = vec![Some(list.clone())];
    let result = guard
        .invoke(&subject, &MethodId::new("CaseService::list"), &mut args, |args| {
            Ok::<_, anyhow::Error>(args[0].clone())
        })
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    assert_eq!(subject.calls(), 0);
    assert_eq!(args, vec![Some(list.clone())]);
    assert_eq!(result, Some(list.clone()));

    let result = guard
        .invoke(&subject, &MethodId::new("CaseService::search"), &mut [], |_| {
            Ok::<_, anyhow::Error>(Some(list.clone()))
        })
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    assert_eq!(result, Some(list));
    assert_eq!(subject.calls(), 0);
    Ok(())
}

#[test]
fn return_value_collections_are_narrowed() -> anyhow::Result<()> {
    let guard = enforcing_guard()?;
    let subject = granting(&["case:view:Madera"]);

    let result = guard
        .invoke(&subject, &MethodId::new("CaseService::search"), &mut [], |_| {
            Ok::<_, anyhow::Error>(Some(value_of(&vec![
                case(1, "Yolo"),
                case(2, "Madera"),
                case(3, "Placer"),
                case(4, "Madera"),
            ])))
        })
        .map_err(|e| anyhow::anyhow!("{e}"))?
        .context("search returns a list")?;

    let visible: Vec<Case> = result.into_typed()?;
    assert_eq!(visible, vec![case(2, "Madera"), case(4, "Madera")]);
    Ok(())
}

#[test]
fn return_value_denial_happens_after_side_effects() -> anyhow::Result<()> {
    let guard = enforcing_guard()?;
    let subject = granting(&["case:view:Yolo"]);
    let writes = Cell::new(0);

    let err = guard
        .invoke(&subject, &MethodId::new("CaseService::search"), &mut [], |_| {
            writes.set(writes.get() + 1);
            Ok::<_, anyhow::Error>(Some(value_of(&case(9, "Madera"))))
        })
        .err()
        .context("result should be denied")?;

    assert!(err.is_access_denied());
    assert_eq!(writes.get(), 1);
    Ok(())
}

#[test]
fn null_results_are_not_checked() -> anyhow::Result<()> {
    let guard = enforcing_guard()?;
    let subject = granting(&[]);

    let result = guard
        .invoke(&subject, &MethodId::new("CaseService::search"), &mut [], |_| {
            Ok::<_, anyhow::Error>(None)
        })
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    assert_eq!(result, None);

    let result = guard
        .invoke(&subject, &MethodId::new("CaseService::search"), &mut [], |_| {
            Ok::<_, anyhow::Error>(Some(value_of(&None::<Case>)))
        })
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    assert_eq!(result, Some(Value::Null));
    assert_eq!(subject.calls(), 0);
    Ok(())
}

#[test]
fn serialized_null_arguments_are_not_checked() -> anyhow::Result<()> {
    let guard = enforcing_guard()?;
    let subject = granting(&[]);
    let ran = Cell::new(false);

    let mut args = vec![Some(value_of(&None::<Case>))];
    guard
        .invoke(&subject, &MethodId::new("CaseService::view"), &mut args, |_| {
            ran.set(true);
            Ok::<_, anyhow::Error>(None)
        })
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    assert!(ran.get());
    assert_eq!(subject.calls(), 0);
    Ok(())
}

#[test]
fn collection_without_any_grant_is_denied_outright() -> anyhow::Result<()> {
    let guard = enforcing_guard()?;
    let subject = granting(&["case:edit"]);
    let ran = Cell::new(false);

    let mut args = vec![Some(value_of(&vec![case(1, "Yolo")]))];
    let err = guard
        .invoke(&subject, &MethodId::new("CaseService::list"), &mut args, |_| {
            ran.set(true);
            Ok::<_, anyhow::Error>(None)
        })
        .err()
        .context("no grant at all should deny")?;

    assert!(matches!(err, InvocationError::Guard(GuardError::Denied(_))));
    assert!(!ran.get());
    Ok(())
}

#[test]
fn registry_loaded_from_json_enforces_the_same_rules() -> anyhow::Result<()> {
    let registry = PolicyRegistry::from_json(
        r#"{
            "CaseService::list": {
                "parameters": [{ "index": 0, "name": "cases", "permissions": ["case:view:cases.county"] }]
            }
        }"#,
    )?;
    let guard = Guard::new(registry, &SecurityConfig::from_json("{}")?);
    let subject = granting(&["case:view:Yolo"]);

    let mut args = vec![Some(value_of(&vec![case(1, "Madera"), case(2, "Yolo")]))];
    guard
        .invoke(&subject, &MethodId::new("CaseService::list"), &mut args, |_| {
            Ok::<_, anyhow::Error>(None)
        })
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    let visible: Vec<Case> = args[0].clone().unwrap_or_default().into_typed()?;
    assert_eq!(visible, vec![case(2, "Yolo")]);
    Ok(())
}
