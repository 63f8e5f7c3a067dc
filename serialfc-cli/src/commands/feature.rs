//! Feature read/write command implementations.

use {
    super::{SessionOptions, open_session},
    anyhow::{Context, Result},
    console::style,
    serde::Serialize,
    serialfc::{
        CardType, ControlChannel, ExternalTransmit, FastcomPort, Feature, FeatureSnapshot,
        FixedBaudRate, HandleProvider, IsochronousMode, Mode, Shape,
    },
    std::fmt,
};

/// A value read back from the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub(crate) enum FeatureValue {
    Flag(bool),
    Number(u32),
    Isochronous(IsochronousMode),
    ExternalTransmit(ExternalTransmit),
    FixedBaudRate(FixedBaudRate),
    CardType(CardType),
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(true) => write!(f, "on"),
            Self::Flag(false) => write!(f, "off"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Isochronous(mode) => write!(f, "{mode}"),
            Self::ExternalTransmit(ext) => write!(f, "{ext}"),
            Self::FixedBaudRate(rate) => write!(f, "{rate}"),
            Self::CardType(card) => write!(f, "{card}"),
        }
    }
}

/// A change to apply to one feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Change {
    /// Turn a boolean feature on or off.
    Toggle(bool),
    /// Write a numeric setting or the clock rate.
    Value(u32),
    /// Enable a mode feature with its argument.
    Enable(u32),
    /// Disable a mode feature.
    Disable,
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Toggle(true) => write!(f, "on"),
            Self::Toggle(false) => write!(f, "off"),
            Self::Value(v) => write!(f, "{v}"),
            Self::Enable(v) => write!(f, "enabled ({v})"),
            Self::Disable => write!(f, "disabled"),
        }
    }
}

/// Parse a feature name for clap.
pub(crate) fn parse_feature(s: &str) -> Result<Feature, String> {
    s.parse::<Feature>()
        .map_err(|_| {
            let names: Vec<&str> = Feature::ALL
                .iter()
                .map(|f| f.name())
                .collect();
            format!("unknown feature '{s}' (expected one of: {})", names.join(", "))
        })
}

/// Parse an on/off value.
pub(crate) fn parse_toggle(s: &str) -> Result<bool, String> {
    match s
        .trim()
        .to_lowercase()
        .as_str()
    {
        "on" | "true" | "1" | "enable" | "enabled" | "yes" => Ok(true),
        "off" | "false" | "0" | "disable" | "disabled" | "no" => Ok(false),
        _ => Err(format!("invalid switch value '{s}' (expected on/off)")),
    }
}

/// Parse a decimal or `0x` hexadecimal number (underscores allowed).
pub(crate) fn parse_u32(s: &str) -> Result<u32, String> {
    let s: String = s
        .trim()
        .chars()
        .filter(|c| *c != '_')
        .collect();
    let parsed = if let Some(hex) = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
    {
        u32::from_str_radix(hex, 16)
    } else {
        s.parse::<u32>()
    };
    parsed.map_err(|e| format!("invalid number '{s}': {e}"))
}

/// Interpret the value argument of `set` for `feature`.
pub(crate) fn parse_change(feature: Feature, value: &str) -> Result<Change, String> {
    match feature.shape() {
        Shape::Toggle(_) => parse_toggle(value).map(Change::Toggle),
        Shape::Setting(_) | Shape::WriteOnly => parse_u32(value).map(Change::Value),
        // Mode arguments may legitimately be 0, so only words disable.
        Shape::Mode(_) => match value
            .trim()
            .to_lowercase()
            .as_str()
        {
            "off" | "disable" | "disabled" | "none" => Ok(Change::Disable),
            _ => parse_u32(value).map(Change::Enable),
        },
        Shape::ReadOnly => Err(format!("{feature} is read-only")),
    }
}

/// Apply one change through the session.
pub(crate) fn apply_change<P: HandleProvider, C: ControlChannel>(
    session: &mut FastcomPort<P, C>,
    feature: Feature,
    change: Change,
) -> Result<()> {
    let result = match (feature.shape(), change) {
        (Shape::Toggle(toggle), Change::Toggle(on)) => session.set_toggle(toggle, on),
        (Shape::Setting(setting), Change::Value(value)) => session.set_setting(setting, value),
        (Shape::WriteOnly, Change::Value(rate)) => session.set_clock_rate(rate),
        (Shape::Mode(mode), Change::Enable(arg)) => session.enable_mode(mode, arg),
        (Shape::Mode(mode), Change::Disable) => session.disable_mode(mode),
        _ => anyhow::bail!("{feature} cannot be set to {change}"),
    };
    result.with_context(|| format!("Failed to set {feature}"))
}

/// Read one feature.
pub(crate) fn read_feature<P: HandleProvider, C: ControlChannel>(
    session: &mut FastcomPort<P, C>,
    feature: Feature,
) -> serialfc::Result<FeatureValue> {
    match feature.shape() {
        Shape::Toggle(toggle) => session
            .toggle(toggle)
            .map(FeatureValue::Flag),
        Shape::Setting(setting) => session
            .setting(setting)
            .map(FeatureValue::Number),
        Shape::Mode(Mode::Isochronous) => session
            .isochronous()
            .map(FeatureValue::Isochronous),
        Shape::Mode(Mode::ExternalTransmit) => session
            .external_transmit()
            .map(FeatureValue::ExternalTransmit),
        Shape::Mode(Mode::FixedBaudRate) => session
            .fixed_baud_rate()
            .map(FeatureValue::FixedBaudRate),
        Shape::ReadOnly => session
            .card_type()
            .map(FeatureValue::CardType),
        Shape::WriteOnly => Err(serialfc::Error::Unsupported(format!(
            "{feature} is write-only"
        ))),
    }
}

/// Flatten a snapshot into display order.
pub(crate) fn snapshot_entries(
    snapshot: FeatureSnapshot,
) -> Vec<(Feature, serialfc::Result<FeatureValue>)> {
    vec![
        (
            Feature::CardType,
            snapshot
                .card_type
                .map(FeatureValue::CardType),
        ),
        (Feature::Rs485, snapshot.rs485.map(FeatureValue::Flag)),
        (
            Feature::EchoCancel,
            snapshot
                .echo_cancel
                .map(FeatureValue::Flag),
        ),
        (
            Feature::Termination,
            snapshot
                .termination
                .map(FeatureValue::Flag),
        ),
        (Feature::NineBit, snapshot.nine_bit.map(FeatureValue::Flag)),
        (
            Feature::SampleRate,
            snapshot
                .sample_rate
                .map(FeatureValue::Number),
        ),
        (
            Feature::TxTrigger,
            snapshot
                .tx_trigger
                .map(FeatureValue::Number),
        ),
        (
            Feature::RxTrigger,
            snapshot
                .rx_trigger
                .map(FeatureValue::Number),
        ),
        (
            Feature::FrameLength,
            snapshot
                .frame_length
                .map(FeatureValue::Number),
        ),
        (
            Feature::Isochronous,
            snapshot
                .isochronous
                .map(FeatureValue::Isochronous),
        ),
        (
            Feature::ExternalTransmit,
            snapshot
                .external_transmit
                .map(FeatureValue::ExternalTransmit),
        ),
        (
            Feature::FixedBaudRate,
            snapshot
                .fixed_baud_rate
                .map(FeatureValue::FixedBaudRate),
        ),
    ]
}

fn entry_json(result: &serialfc::Result<FeatureValue>) -> serde_json::Value {
    match result {
        Ok(value) => serde_json::json!({ "value": value }),
        Err(e) => serde_json::json!({
            "error": e.to_string(),
            "code": e.driver_code(),
        }),
    }
}

/// Show command implementation.
pub(crate) fn cmd_show(opts: &SessionOptions, json: bool) -> Result<()> {
    let mut session = open_session(opts)?;
    let entries = snapshot_entries(session.snapshot());

    if json {
        let features: serde_json::Map<String, serde_json::Value> = entries
            .iter()
            .map(|(feature, result)| (feature.name().to_string(), entry_json(result)))
            .collect();
        let output = serde_json::json!({
            "ok": true,
            "data": {
                "port": opts.port,
                "dry_run": opts.dry_run,
                "features": features,
            }
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    eprintln!(
        "{}",
        style(format!("Features of {}", opts.target()))
            .bold()
            .underlined()
    );
    for (feature, result) in &entries {
        let value = match result {
            Ok(value) => style(value.to_string()).cyan(),
            Err(e) => style(e.to_string()).red(),
        };
        println!(
            "  {:<18} {:<28} {}",
            feature.name(),
            value,
            style(feature.description()).dim()
        );
    }

    Ok(())
}

/// Get command implementation.
pub(crate) fn cmd_get(opts: &SessionOptions, feature: Feature, json: bool) -> Result<()> {
    if !feature.is_readable() {
        anyhow::bail!("{feature} is write-only and cannot be read back");
    }

    let mut session = open_session(opts)?;
    let value =
        read_feature(&mut session, feature).with_context(|| format!("Failed to read {feature}"))?;

    if json {
        let output = serde_json::json!({
            "ok": true,
            "data": {
                "feature": feature.name(),
                "value": value,
            }
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{value}");
    }

    Ok(())
}

/// Set command implementation.
pub(crate) fn cmd_set(opts: &SessionOptions, feature: Feature, value: &str, quiet: bool) -> Result<()> {
    let change = parse_change(feature, value).map_err(anyhow::Error::msg)?;
    run_change(opts, feature, change, quiet)
}

/// Enable command implementation.
pub(crate) fn cmd_enable(opts: &SessionOptions, feature: Feature, value: u32, quiet: bool) -> Result<()> {
    require_mode(feature)?;
    run_change(opts, feature, Change::Enable(value), quiet)
}

/// Disable command implementation.
pub(crate) fn cmd_disable(opts: &SessionOptions, feature: Feature, quiet: bool) -> Result<()> {
    require_mode(feature)?;
    run_change(opts, feature, Change::Disable, quiet)
}

fn require_mode(feature: Feature) -> Result<()> {
    if matches!(feature.shape(), Shape::Mode(_)) {
        Ok(())
    } else {
        anyhow::bail!(
            "{feature} is not a mode feature; use `serialfc set {feature} <value>` instead"
        )
    }
}

fn run_change(opts: &SessionOptions, feature: Feature, change: Change, quiet: bool) -> Result<()> {
    let mut session = open_session(opts)?;
    apply_change(&mut session, feature, change)?;

    if !quiet {
        eprintln!(
            "{} {} {} {}",
            style("✓").green(),
            style(feature).cyan(),
            style("→").dim(),
            change
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use {super::*, crate::commands::Session};

    fn dry_session() -> Session {
        open_session(&SessionOptions {
            port: None,
            baud: 115200,
            dry_run: true,
        })
        .unwrap()
    }

    #[test]
    fn test_parse_toggle_values() {
        for on in ["on", "ON", "true", "1", "enable", "yes"] {
            assert_eq!(parse_toggle(on), Ok(true), "{on}");
        }
        for off in ["off", "False", "0", "disable", "no"] {
            assert_eq!(parse_toggle(off), Ok(false), "{off}");
        }
        assert!(parse_toggle("maybe").is_err());
    }

    #[test]
    fn test_parse_u32_decimal_and_hex() {
        assert_eq!(parse_u32("64"), Ok(64));
        assert_eq!(parse_u32("0x40"), Ok(64));
        assert_eq!(parse_u32("0X1_0000"), Ok(0x10000));
        assert_eq!(parse_u32("14_745_600"), Ok(14_745_600));
        assert_eq!(parse_u32("4294967295"), Ok(u32::MAX));
        assert!(parse_u32("4294967296").is_err());
        assert!(parse_u32("-1").is_err());
        assert!(parse_u32("0xZZ").is_err());
    }

    #[test]
    fn test_parse_feature_lists_names_on_error() {
        assert_eq!(parse_feature("rs485"), Ok(Feature::Rs485));
        assert_eq!(parse_feature("rx_trigger"), Ok(Feature::RxTrigger));
        let err = parse_feature("turbo").unwrap_err();
        assert!(err.contains("rs485"));
        assert!(err.contains("card-type"));
    }

    #[test]
    fn test_parse_change_by_shape() {
        assert_eq!(parse_change(Feature::Rs485, "on"), Ok(Change::Toggle(true)));
        assert_eq!(parse_change(Feature::SampleRate, "8"), Ok(Change::Value(8)));
        assert_eq!(
            parse_change(Feature::ClockRate, "0xE10000"),
            Ok(Change::Value(0xE1_0000))
        );
        assert_eq!(parse_change(Feature::Isochronous, "3"), Ok(Change::Enable(3)));
        assert_eq!(parse_change(Feature::Isochronous, "0"), Ok(Change::Enable(0)));
        assert_eq!(parse_change(Feature::Isochronous, "off"), Ok(Change::Disable));
        assert!(parse_change(Feature::CardType, "1").is_err());
        assert!(parse_change(Feature::Termination, "12").is_err());
    }

    #[test]
    fn test_apply_and_read_back() {
        let mut session = dry_session();
        apply_change(&mut session, Feature::EchoCancel, Change::Toggle(true)).unwrap();
        apply_change(&mut session, Feature::TxTrigger, Change::Value(48)).unwrap();
        apply_change(&mut session, Feature::ExternalTransmit, Change::Enable(4)).unwrap();

        assert_eq!(
            read_feature(&mut session, Feature::EchoCancel).unwrap(),
            FeatureValue::Flag(true)
        );
        assert_eq!(
            read_feature(&mut session, Feature::TxTrigger).unwrap(),
            FeatureValue::Number(48)
        );
        assert_eq!(
            read_feature(&mut session, Feature::ExternalTransmit).unwrap(),
            FeatureValue::ExternalTransmit(ExternalTransmit::Enabled(4))
        );
    }

    #[test]
    fn test_apply_mismatched_change_fails() {
        let mut session = dry_session();
        assert!(apply_change(&mut session, Feature::Rs485, Change::Value(1)).is_err());
        assert!(apply_change(&mut session, Feature::CardType, Change::Disable).is_err());
    }

    #[test]
    fn test_clock_rate_is_not_readable() {
        let mut session = dry_session();
        assert!(read_feature(&mut session, Feature::ClockRate).is_err());
    }

    #[test]
    fn test_snapshot_entries_cover_readable_features() {
        let mut session = dry_session();
        let entries = snapshot_entries(session.snapshot());
        let readable = Feature::ALL
            .iter()
            .filter(|f| f.is_readable())
            .count();
        assert_eq!(entries.len(), readable);
        assert!(
            entries
                .iter()
                .all(|(_, r)| r.is_ok())
        );
    }

    #[test]
    fn test_feature_value_json() {
        assert_eq!(
            serde_json::to_value(FeatureValue::Flag(true)).unwrap(),
            serde_json::json!(true)
        );
        assert_eq!(
            serde_json::to_value(FeatureValue::Isochronous(IsochronousMode::Enabled(3))).unwrap(),
            serde_json::json!({ "enabled": 3 })
        );
        assert_eq!(
            serde_json::to_value(FeatureValue::FixedBaudRate(FixedBaudRate::Disabled)).unwrap(),
            serde_json::json!("disabled")
        );
        assert_eq!(
            serde_json::to_value(FeatureValue::CardType(CardType::Fscc)).unwrap(),
            serde_json::json!("fscc")
        );
    }

    #[test]
    fn test_feature_value_display() {
        assert_eq!(FeatureValue::Flag(false).to_string(), "off");
        assert_eq!(FeatureValue::Number(16).to_string(), "16");
        assert_eq!(
            FeatureValue::CardType(CardType::Pcie).to_string(),
            "Async-PCIe"
        );
    }
}
