//! Command-line front-ends shared by the `hush` and `hush-keygen` binaries.
//! Both only go through the public store and crypto APIs.

use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use serde_json::{Map, Value};
use tracing_subscriber::EnvFilter;

use crate::config::{HushConfig, Overrides};
use crate::crypto::keypair::generate_keypair;
use crate::store::{is_private_name, ErrorKind, Section, SectionStore, StoreError};

const REDACTED: &str = "<redacted>";

/// Edit one section of a secret configuration file.
#[derive(Debug, Parser)]
#[command(name = "hush")]
#[command(version)]
#[command(about = "Store credentials in a sectioned config file; fields prefixed with __ are encrypted")]
#[command(after_help = r#"EXAMPLES:
    hush --section twitter_app1 --fields 'user,__password'
    hush --section github --fields 'user,__token' --set user=ahmed
    hush --section github --show

The store key is the SHA-256 of the private key file's raw bytes."#)]
pub struct HushCli {
    /// Section (application) name
    #[arg(long)]
    pub section: String,

    /// Quoted comma separated fields; secret fields are prefixed with __
    #[arg(long, default_value = "")]
    pub fields: String,

    /// Private key file the store key is derived from [default: ~/.ssh/id_rsa]
    #[arg(long)]
    pub privatekey: Option<String>,

    /// Secret configuration path [default: /tmp/secrets.conf]
    #[arg(long)]
    pub configpath: Option<String>,

    /// JSON file with `store_path` / `private_key_path` defaults
    #[arg(long)]
    pub config: Option<String>,

    /// Preset a value instead of prompting (repeatable, `name=value`)
    #[arg(long = "set", value_name = "NAME=VALUE")]
    pub presets: Vec<String>,

    /// Print the section as JSON instead of editing it
    #[arg(long)]
    pub show: bool,

    /// With --show, print private values instead of redacting them
    #[arg(long, requires = "show")]
    pub reveal: bool,
}

/// Generate a base64-encoded X25519 key pair.
#[derive(Debug, Parser)]
#[command(name = "hush-keygen")]
#[command(version)]
#[command(about = "Generate <name>.priv and <name>.pub key files")]
pub struct KeygenCli {
    /// Keypair name
    #[arg(long)]
    pub name: Option<String>,

    /// Directory to write the key files into
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,
}

/// Installs the stderr log subscriber; level comes from `RUST_LOG`.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .try_init();
}

pub fn run_hush(cli: HushCli) -> Result<()> {
    if cli.section.trim().is_empty() {
        bail!("--section is required");
    }

    let config = HushConfig::resolve(
        Overrides {
            store_path: cli.configpath.clone(),
            private_key_path: cli.privatekey.clone(),
            config_file: cli.config.clone(),
        }
        .with_env(),
    )?;
    let key = config.load_key()?;
    let store = SectionStore::new(&config.store_path);

    let current = store
        .read_section(&cli.section, &key)
        .map_err(|e| explain(e, &config))?;

    if cli.show {
        let json = section_json(&current, cli.reveal);
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    let fields = parse_fields(&cli.fields);
    if fields.is_empty() {
        bail!("--fields must list at least one field, e.g. --fields 'user,__password'");
    }
    let presets = parse_presets(&cli.presets)?;

    let values = collect_values(&fields, &current, &presets, prompt_terminal)?;
    store
        .write_section(&cli.section, values, &key)
        .map_err(|e| explain(e, &config))?;

    eprintln!(
        "saved {} field(s) to [{}] in {}",
        fields.len(),
        cli.section,
        config.store_path.display()
    );
    Ok(())
}

pub fn run_keygen(cli: KeygenCli) -> Result<()> {
    let name = match cli.name {
        Some(name) if !name.is_empty() => name,
        _ => {
            eprintln!("didn't specify --name. will generate (mykey.priv, mykey.pub)");
            "mykey".to_string()
        }
    };
    let paths = generate_keypair(&cli.dir, &name)?;
    println!("{}", paths.private_key.display());
    println!("{}", paths.public_key.display());
    Ok(())
}

/// Splits `--fields`, trimming whitespace and dropping empty entries.
pub fn parse_fields(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn parse_presets(raw: &[String]) -> Result<HashMap<String, String>> {
    raw.iter()
        .map(|entry| {
            entry
                .split_once('=')
                .map(|(name, value)| (name.trim().to_string(), value.to_string()))
                .ok_or_else(|| anyhow!("--set expects NAME=VALUE, got {entry:?}"))
        })
        .collect()
}

/// Picks a value for every requested field: preset first, otherwise the
/// prompt. An empty answer keeps the current value. A preset for a field
/// that is not requested is a usage error.
pub fn collect_values<P>(
    fields: &[String],
    current: &Section,
    presets: &HashMap<String, String>,
    mut prompt: P,
) -> Result<Vec<(String, String)>>
where
    P: FnMut(&str, Option<&str>) -> Result<String>,
{
    let mut unknown: Vec<&str> = presets
        .keys()
        .filter(|name| !fields.contains(*name))
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        unknown.sort_unstable();
        bail!(
            "--set names field(s) not listed in --fields: {}",
            unknown.join(", ")
        );
    }

    let mut values = Vec::with_capacity(fields.len());
    for field in fields {
        let existing = current.get(field);
        let value = match presets.get(field) {
            Some(preset) => preset.clone(),
            None => {
                let answer = prompt(field, existing)?;
                if answer.is_empty() {
                    existing.unwrap_or_default().to_string()
                } else {
                    answer
                }
            }
        };
        values.push((field.clone(), value));
    }
    Ok(values)
}

fn prompt_terminal(field: &str, existing: Option<&str>) -> Result<String> {
    if is_private_name(field) {
        let hint = if existing.is_some() { " (enter keeps current)" } else { "" };
        return rpassword::prompt_password(format!("{field}{hint}: "))
            .with_context(|| format!("failed to read value for {field}"));
    }

    let mut stderr = io::stderr();
    match existing {
        Some(value) => write!(stderr, "{field} [{value}]: ")?,
        None => write!(stderr, "{field}: ")?,
    }
    stderr.flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .with_context(|| format!("failed to read value for {field}"))?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

pub fn section_json(section: &Section, reveal: bool) -> Value {
    let mut map = Map::new();
    for field in section.fields() {
        let value = if field.is_private() && !reveal {
            REDACTED
        } else {
            field.value()
        };
        map.insert(field.name().to_string(), Value::String(value.to_string()));
    }
    Value::Object(map)
}

fn explain(err: StoreError, config: &HushConfig) -> anyhow::Error {
    let hint = match err.kind() {
        ErrorKind::Authentication => format!(
            "cannot decrypt {}; is {} the key it was written with?",
            config.store_path.display(),
            config.private_key_path.display()
        ),
        ErrorKind::Format => format!("{} is corrupt", config.store_path.display()),
        _ => format!("store operation on {} failed", config.store_path.display()),
    };
    anyhow::Error::new(err).context(hint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::integrity::derive_key;
    use std::fs;

    #[test]
    fn parses_long_flag_names() {
        let cli = HushCli::try_parse_from([
            "hush",
            "--section",
            "sillyapp1",
            "--fields",
            "user, __password",
            "--configpath",
            "~/secrets.conf",
            "--privatekey",
            "~/.ssh/id_ed25519",
        ])
        .unwrap();
        assert_eq!(cli.section, "sillyapp1");
        assert_eq!(parse_fields(&cli.fields), ["user", "__password"]);
        assert_eq!(cli.configpath.as_deref(), Some("~/secrets.conf"));
        assert!(!cli.show);
    }

    #[test]
    fn reveal_requires_show() {
        assert!(HushCli::try_parse_from(["hush", "--section", "s", "--reveal"]).is_err());
        let cli = HushCli::try_parse_from(["hush", "--section", "s", "--show", "--reveal"]).unwrap();
        assert!(cli.show && cli.reveal);
    }

    #[test]
    fn keygen_defaults_to_current_dir() {
        let cli = KeygenCli::try_parse_from(["hush-keygen"]).unwrap();
        assert_eq!(cli.name, None);
        assert_eq!(cli.dir, PathBuf::from("."));
    }

    #[test]
    fn presets_split_on_first_equals() {
        let presets =
            parse_presets(&["user=ahmed".to_string(), "__token=a=b".to_string()]).unwrap();
        assert_eq!(presets["user"], "ahmed");
        assert_eq!(presets["__token"], "a=b");
        assert!(parse_presets(&["novalue".to_string()]).is_err());
    }

    #[test]
    fn collects_presets_prompts_and_keeps_current() {
        let current = Section::from_pairs("s", [("user", "old"), ("__password", "secret")]);
        let fields = parse_fields("user,__password,email");
        let presets = parse_presets(&["email=a@b.c".to_string()]).unwrap();

        let mut asked = Vec::new();
        let values = collect_values(&fields, &current, &presets, |field, existing| {
            asked.push((field.to_string(), existing.map(str::to_string)));
            Ok(if field == "user" { "new".to_string() } else { String::new() })
        })
        .unwrap();

        assert_eq!(
            values,
            [
                ("user".to_string(), "new".to_string()),
                ("__password".to_string(), "secret".to_string()),
                ("email".to_string(), "a@b.c".to_string()),
            ]
        );
        assert_eq!(asked.len(), 2);
        assert_eq!(asked[1], ("__password".to_string(), Some("secret".to_string())));
    }

    #[test]
    fn preset_outside_fields_is_rejected() {
        let current = Section::new("s");
        let fields = parse_fields("user");
        let presets = parse_presets(&["usr=typo".to_string()]).unwrap();

        let err = collect_values(&fields, &current, &presets, |_, _| {
            panic!("nothing should be prompted")
        })
        .unwrap_err();
        assert!(format!("{err}").contains("usr"));
    }

    #[test]
    fn show_redacts_private_values_by_default() {
        let section = Section::from_pairs("s", [("user", "ahmed"), ("__password", "weakpassword")]);
        let hidden = section_json(&section, false);
        assert_eq!(hidden["user"], "ahmed");
        assert_eq!(hidden["__password"], REDACTED);
        assert_eq!(section_json(&section, true)["__password"], "weakpassword");
    }

    #[test]
    fn hush_writes_presets_without_prompting() {
        let dir = tempfile::tempdir().expect("temp dir");
        let key_path = dir.path().join("mykey.priv");
        let store_path = dir.path().join("secrets.conf");
        fs::write(&key_path, b"private key material").unwrap();

        let cli = HushCli::try_parse_from([
            "hush",
            "--section",
            "twitter_app1",
            "--fields",
            "user,__password",
            "--privatekey",
            key_path.to_str().unwrap(),
            "--configpath",
            store_path.to_str().unwrap(),
            "--set",
            "user=ahmed",
            "--set",
            "__password=weakpassword",
        ])
        .unwrap();
        run_hush(cli).expect("hush should write the section");

        let content = fs::read_to_string(&store_path).unwrap();
        assert!(content.contains("user = ahmed"));
        assert!(!content.contains("weakpassword"));

        let section = SectionStore::new(&store_path)
            .read_section("twitter_app1", &derive_key(b"private key material"))
            .unwrap();
        assert_eq!(section.get("__password"), Some("weakpassword"));
    }

    #[test]
    fn wrong_key_error_mentions_the_key_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store_path = dir.path().join("secrets.conf");
        SectionStore::new(&store_path)
            .write_section("s", [("__pw", "x")], &derive_key(b"right"))
            .unwrap();
        let wrong_key = dir.path().join("wrong.priv");
        fs::write(&wrong_key, b"wrong").unwrap();

        let cli = HushCli::try_parse_from([
            "hush",
            "--section",
            "s",
            "--show",
            "--privatekey",
            wrong_key.to_str().unwrap(),
            "--configpath",
            store_path.to_str().unwrap(),
        ])
        .unwrap();
        let err = run_hush(cli).unwrap_err();
        assert!(format!("{err}").contains("wrong.priv"));
        let store_err = err.downcast_ref::<StoreError>().expect("store error preserved");
        assert_eq!(store_err.kind(), ErrorKind::Authentication);
    }

    #[test]
    fn keygen_writes_into_requested_dir() {
        let dir = tempfile::tempdir().expect("temp dir");
        run_keygen(KeygenCli {
            name: Some("deploy".to_string()),
            dir: dir.path().to_path_buf(),
        })
        .unwrap();
        assert!(dir.path().join("deploy.priv").exists());
        assert!(dir.path().join("deploy.pub").exists());
    }
}
