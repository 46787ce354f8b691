use cg_domain::config::{BackendTransport, Config, ConfigSeverity};

/// Parse and validate the config, printing any issues.
///
/// Returns `false` when errors are found.
pub fn validate(config: &Config, config_path: &str) -> bool {
    let issues = config.validate();

    println!(
        "master: {}, store: {}",
        describe(config.master.transport, &config.master.base_url),
        describe(config.store.transport, &config.store.base_url),
    );

    if issues.is_empty() {
        println!("Config OK ({config_path})");
        return true;
    }

    let error_count = issues
        .iter()
        .filter(|e| e.severity == ConfigSeverity::Error)
        .count();
    let warning_count = issues.len() - error_count;

    for issue in &issues {
        println!("{issue}");
    }

    println!("\n{error_count} error(s), {warning_count} warning(s) in {config_path}");

    error_count == 0
}

fn describe(transport: BackendTransport, base_url: &str) -> String {
    match transport {
        BackendTransport::Rest => format!("rest ({base_url})"),
        BackendTransport::Memory => "memory".to_owned(),
    }
}

/// Render the resolved config (all defaults filled in) as TOML with
/// secrets masked.
pub fn render(config: &Config) -> anyhow::Result<String> {
    let mut redacted = config.clone();
    for key in [
        &mut redacted.master.api_key,
        &mut redacted.store.api_key,
        &mut redacted.admin.token,
    ] {
        if key.is_some() {
            *key = Some("********".into());
        }
    }
    Ok(toml::to_string_pretty(&redacted)?)
}

/// Print the resolved config for `chatgate config show`.
pub fn show(config: &Config) -> anyhow::Result<()> {
    print!("{}", render(config)?);
    Ok(())
}
