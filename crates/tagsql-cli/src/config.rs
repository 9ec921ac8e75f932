use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ProjectConfig {
    pub config_path: PathBuf,
    pub file: ConfigFile,
}

impl ProjectConfig {
    pub fn load(config_path: PathBuf) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(&config_path).map_err(|e| {
            anyhow::anyhow!(
                "failed to read config file {}: {e}",
                config_path.display()
            )
        })?;

        let file = ConfigFile::parse(&raw).map_err(|e| {
            anyhow::anyhow!("invalid config file {}: {e:#}", config_path.display())
        })?;

        Ok(Self { config_path, file })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,

    #[serde(default)]
    pub databases: Vec<DatabaseConfig>,

    pub copy: Option<CopyConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CopyConfig {
    pub source: String,
    #[serde(default = "default_source_table")]
    pub source_table: String,
    pub target: String,
    #[serde(default = "default_target_table")]
    pub target_table: String,
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
}

fn default_source_table() -> String {
    "ads_tags".to_string()
}

fn default_target_table() -> String {
    "ads_tag_copy".to_string()
}

fn default_primary_key() -> String {
    "id".to_string()
}

impl ConfigFile {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let mut file: ConfigFile =
            toml::from_str(raw).map_err(|e| anyhow::anyhow!("failed to parse: {e}"))?;
        file.expand_env()?;
        file.validate()?;
        Ok(file)
    }

    pub fn database(&self, name: &str) -> Option<&DatabaseConfig> {
        self.databases.iter().find(|db| db.name == name)
    }

    fn expand_env(&mut self) -> anyhow::Result<()> {
        for db in &mut self.databases {
            db.name = expand_env_vars(&db.name)?;
            db.url = expand_env_vars(&db.url)?;
        }

        if let Some(copy) = self.copy.as_mut() {
            copy.source = expand_env_vars(&copy.source)?;
            copy.target = expand_env_vars(&copy.target)?;
            copy.source_table = expand_env_vars(&copy.source_table)?;
            copy.target_table = expand_env_vars(&copy.target_table)?;
        }

        Ok(())
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.version.trim() != "1" {
            anyhow::bail!("unsupported config version: {}", self.version);
        }

        if self.databases.is_empty() {
            anyhow::bail!("at least one [[databases]] entry is required");
        }

        let mut seen = std::collections::HashSet::<&str>::new();
        for db in &self.databases {
            if db.name.trim().is_empty() {
                anyhow::bail!("databases.name must not be empty");
            }
            if !seen.insert(db.name.as_str()) {
                anyhow::bail!("duplicate databases.name: {}", db.name);
            }
            if db.url.trim().is_empty() {
                anyhow::bail!("databases.url must not be empty (database: {})", db.name);
            }
        }

        if let Some(copy) = &self.copy {
            for name in [&copy.source, &copy.target] {
                if self.database(name).is_none() {
                    anyhow::bail!("copy refers to unknown database: {name}");
                }
            }
            if copy.source_table.trim().is_empty() || copy.target_table.trim().is_empty() {
                anyhow::bail!("copy.source_table and copy.target_table must not be empty");
            }
        }

        Ok(())
    }
}

fn expand_env_vars(input: &str) -> anyhow::Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next();

            let mut key = String::new();
            let mut closed = false;
            for ch in chars.by_ref() {
                if ch == '}' {
                    closed = true;
                    break;
                }
                key.push(ch);
            }

            if !closed {
                anyhow::bail!("unterminated env var reference: ${{{key}");
            }
            if key.is_empty() {
                anyhow::bail!("invalid env var reference: ${{}}");
            }

            let v = std::env::var(&key)
                .map_err(|_| anyhow::anyhow!("missing env var for config expansion: {key}"))?;
            out.push_str(&v);
            continue;
        }

        out.push(c);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC: &str = r#"
version = "1"

[[databases]]
name = "bg_dsp4"
url = "postgres://localhost/bg_dsp4"

[[databases]]
name = "bg_email"
url = "postgres://localhost/bg_email"

[copy]
source = "bg_dsp4"
target = "bg_email"
"#;

    #[test]
    fn parses_databases_and_copy_defaults() {
        let file = ConfigFile::parse(BASIC).unwrap();
        assert_eq!(file.databases.len(), 2);
        assert_eq!(
            file.database("bg_email").map(|db| db.url.as_str()),
            Some("postgres://localhost/bg_email")
        );

        let copy = file.copy.unwrap();
        assert_eq!(copy.source_table, "ads_tags");
        assert_eq!(copy.target_table, "ads_tag_copy");
        assert_eq!(copy.primary_key, "id");
    }

    #[test]
    fn expands_env_vars() {
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("TAGSQL_TEST_EMAIL_URL", "postgres://env/bg_email") };
        let raw = BASIC.replace("postgres://localhost/bg_email", "${TAGSQL_TEST_EMAIL_URL}");
        let file = ConfigFile::parse(&raw).unwrap();
        assert_eq!(
            file.database("bg_email").map(|db| db.url.as_str()),
            Some("postgres://env/bg_email")
        );
    }

    #[test]
    fn env_expansion_errors() {
        assert!(expand_env_vars("${TAGSQL_TEST_SURELY_UNSET_VAR}").is_err());
        assert!(expand_env_vars("${unterminated").is_err());
        assert!(expand_env_vars("${}").is_err());
        assert_eq!(expand_env_vars("plain $ text").unwrap(), "plain $ text");
    }

    #[test]
    fn rejects_invalid_configs() {
        let bad_version = BASIC.replace("version = \"1\"", "version = \"2\"");
        assert!(ConfigFile::parse(&bad_version).is_err());

        let duplicate = BASIC.replace("name = \"bg_email\"", "name = \"bg_dsp4\"");
        assert!(ConfigFile::parse(&duplicate).is_err());

        let unknown_target = BASIC.replace("target = \"bg_email\"", "target = \"bg_other\"");
        let err = ConfigFile::parse(&unknown_target).unwrap_err();
        assert!(err.to_string().contains("bg_other"));

        assert!(ConfigFile::parse("version = \"1\"").is_err());
    }
}
