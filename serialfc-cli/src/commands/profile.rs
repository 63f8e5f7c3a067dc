//! Profile command implementations.

use {
    super::{
        SessionOptions,
        feature::{Change, apply_change},
        open_session,
    },
    crate::config::{Config, LOCAL_CONFIG_FILE},
    anyhow::{Context, Result},
    console::style,
    log::{info, warn},
    serialfc::{ControlChannel, FastcomPort, Feature, HandleProvider},
};

/// Apply `changes` in order, stopping at the first failure.
///
/// On failure the error carries how many changes were applied before it.
pub(crate) fn apply_changes<P: HandleProvider, C: ControlChannel>(
    session: &mut FastcomPort<P, C>,
    changes: &[(Feature, Change)],
    quiet: bool,
) -> Result<usize> {
    let total = changes.len();
    for (applied, &(feature, change)) in changes
        .iter()
        .enumerate()
    {
        if let Err(e) = apply_change(session, feature, change) {
            eprintln!(
                "{} {} {}",
                style("✗").red(),
                style(feature).cyan(),
                style("failed").red()
            );
            return Err(e).with_context(|| format!("Stopped after {applied} of {total} changes"));
        }
        if !quiet {
            eprintln!(
                "{} {} {} {}",
                style("✓").green(),
                style(feature).cyan(),
                style("→").dim(),
                change
            );
        }
    }
    Ok(total)
}

/// Apply command implementation.
pub(crate) fn cmd_apply(opts: &SessionOptions, config: &Config, name: &str, quiet: bool) -> Result<()> {
    let changes = config
        .profile(name)?
        .changes()
        .with_context(|| format!("Invalid profile '{name}'"))?;

    if changes.is_empty() {
        warn!("Profile '{name}' sets no features");
        return Ok(());
    }

    let mut session = open_session(opts)?;
    info!("Applying profile '{name}' to {}", opts.target());

    let applied = apply_changes(&mut session, &changes, quiet)
        .with_context(|| format!("Failed to apply profile '{name}'"))?;

    if !quiet {
        eprintln!(
            "\n{} Applied {applied} changes from profile '{}'",
            style("✓")
                .green()
                .bold(),
            style(name).cyan()
        );
    }
    Ok(())
}

/// Profiles command implementation.
pub(crate) fn cmd_profiles(config: &Config, json: bool) -> Result<()> {
    if json {
        let mut profiles = serde_json::Map::new();
        for (name, changes) in config.profile_changes() {
            let entry = match changes {
                Ok(changes) => {
                    let map: serde_json::Map<String, serde_json::Value> = changes
                        .iter()
                        .map(|(feature, change)| {
                            (feature.name().to_string(), change.to_string().into())
                        })
                        .collect();
                    serde_json::json!({ "changes": map })
                },
                Err(e) => serde_json::json!({ "error": e.to_string() }),
            };
            profiles.insert(name.to_string(), entry);
        }
        let output = serde_json::json!({
            "ok": true,
            "data": {
                "profiles": profiles,
            }
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if !config.has_profiles() {
        eprintln!("  {}", style("No profiles configured").dim());
        if let Some(path) = Config::global_config_path() {
            eprintln!(
                "  Add [profile.<name>] sections to {} or ./{LOCAL_CONFIG_FILE}",
                style(path.display()).yellow()
            );
        }
        return Ok(());
    }

    for (name, changes) in config.profile_changes() {
        println!(
            "{}",
            style(name)
                .cyan()
                .bold()
        );
        match changes {
            Ok(changes) => {
                for (feature, change) in changes {
                    println!("  {:<18} {change}", feature.name());
                }
            },
            Err(e) => println!("  {}", style(format!("invalid: {e}")).red()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        serialfc::{DetachedHandle, DeviceHandle, Operation, SimulatedDriver},
    };

    fn sim_session() -> FastcomPort<DetachedHandle, SimulatedDriver> {
        FastcomPort::new(
            DetachedHandle::new(DeviceHandle::from_raw(1)),
            SimulatedDriver::new(),
        )
    }

    #[test]
    fn test_apply_changes_in_order() {
        let mut session = sim_session();
        let changes = [
            (Feature::Rs485, Change::Toggle(true)),
            (Feature::RxTrigger, Change::Value(64)),
            (Feature::Isochronous, Change::Enable(2)),
        ];

        assert_eq!(apply_changes(&mut session, &changes, true).unwrap(), 3);

        let ops: Vec<Operation> = session
            .channel()
            .calls()
            .iter()
            .map(|c| c.op)
            .collect();
        assert_eq!(
            ops,
            vec![
                Operation::EnableRs485,
                Operation::SetRxTrigger,
                Operation::EnableIsochronous
            ]
        );
    }

    #[test]
    fn test_apply_changes_stops_at_first_failure() {
        let mut session = sim_session();
        session
            .channel_mut()
            .fail_with(Operation::SetTxTrigger, 1);
        let changes = [
            (Feature::EchoCancel, Change::Toggle(true)),
            (Feature::TxTrigger, Change::Value(8)),
            (Feature::RxTrigger, Change::Value(8)),
        ];

        let err = apply_changes(&mut session, &changes, true).unwrap_err();
        assert!(format!("{err:#}").contains("Stopped after 1 of 3"));

        let sim = session.channel();
        assert!(sim.state().echo_cancel);
        assert_eq!(sim.calls_to(Operation::SetRxTrigger), 0);
        assert_eq!(sim.calls().len(), 2);
    }

    #[test]
    fn test_apply_changes_surfaces_driver_code() {
        let mut session = sim_session();
        session
            .channel_mut()
            .fail_with(Operation::EnableNineBit, 255);

        let err = apply_changes(&mut session, &[(Feature::NineBit, Change::Toggle(true))], true)
            .unwrap_err();
        let driver = err
            .chain()
            .find_map(|e| e.downcast_ref::<serialfc::Error>())
            .and_then(serialfc::Error::driver_code);
        assert_eq!(driver, Some(255));
    }

    #[test]
    fn test_apply_invalid_profile_fails_before_opening() {
        let config = Config::parse("[profile.typo]\nrs-485 = true\n").unwrap();
        let opts = SessionOptions {
            port: None,
            baud: 115200,
            dry_run: false,
        };
        let err = cmd_apply(&opts, &config, "typo", true).unwrap_err();
        assert!(
            err.to_string()
                .contains("Invalid profile 'typo'")
        );
    }

    #[test]
    fn test_apply_unknown_profile_fails_before_opening() {
        let opts = SessionOptions {
            port: None,
            baud: 115200,
            dry_run: false,
        };
        let err = cmd_apply(&opts, &Config::default(), "missing", true).unwrap_err();
        assert!(
            err.to_string()
                .contains("Unknown profile")
        );
    }
}
