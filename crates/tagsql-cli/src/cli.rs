use std::path::PathBuf;
use tagsql::Dialect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpTopic {
    Root,
    Copy,
    Render,
}

#[derive(Debug, Clone)]
pub enum Command {
    Help(HelpTopic),
    Copy(CopyArgs),
    Render(RenderArgs),
}

#[derive(Debug, Clone)]
pub struct CopyArgs {
    pub config: PathBuf,
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct RenderArgs {
    pub table: String,
    pub primary_key: String,
    pub select: Vec<String>,
    pub wheres: Vec<String>,
    pub order: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub dialect: Dialect,
}

pub fn parse_args(args: &[String]) -> anyhow::Result<Command> {
    let mut it = args.iter().skip(1);
    let Some(first) = it.next() else {
        return Ok(Command::Help(HelpTopic::Root));
    };

    match first.as_str() {
        "-h" | "--help" => Ok(Command::Help(HelpTopic::Root)),
        "copy" => parse_copy(it.map(|s| s.as_str())),
        "render" => parse_render(it.map(|s| s.as_str())),
        _ => anyhow::bail!("unknown command: {first}"),
    }
}

fn parse_copy<'a>(mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let mut config = PathBuf::from("tagsql.toml");
    let mut dry_run = false;

    while let Some(token) = it.next() {
        match token {
            "-h" | "--help" => return Ok(Command::Help(HelpTopic::Copy)),
            "--config" => {
                let Some(v) = it.next() else {
                    anyhow::bail!("--config requires a value");
                };
                config = PathBuf::from(v);
            }
            _ if token.starts_with("--config=") => {
                config = PathBuf::from(token.trim_start_matches("--config="));
            }
            "--dry-run" => dry_run = true,
            other => anyhow::bail!("unknown argument for copy: {other}"),
        }
    }

    Ok(Command::Copy(CopyArgs { config, dry_run }))
}

fn parse_render<'a>(mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let mut table: Option<String> = None;
    let mut primary_key = "id".to_string();
    let mut select = Vec::new();
    let mut wheres = Vec::new();
    let mut order = None;
    let mut limit = None;
    let mut offset = None;
    let mut dialect = Dialect::default();

    while let Some(token) = it.next() {
        let (flag, inline) = match token.split_once('=') {
            Some((flag, v)) if flag.starts_with("--") => (flag, Some(v)),
            _ => (token, None),
        };
        if matches!(flag, "-h" | "--help") {
            return Ok(Command::Help(HelpTopic::Render));
        }

        let mut value = || -> anyhow::Result<&'a str> {
            match inline {
                Some(v) => Ok(v),
                None => it
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("{flag} requires a value")),
            }
        };

        match flag {
            "--table" => table = Some(value()?.to_string()),
            "--pk" => primary_key = value()?.to_string(),
            "--select" => select.extend(
                value()?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty()),
            ),
            "--where" => wheres.push(value()?.to_string()),
            "--order" => order = Some(value()?.to_string()),
            "--limit" => limit = Some(parse_number(flag, value()?)?),
            "--offset" => offset = Some(parse_number(flag, value()?)?),
            "--dialect" => dialect = parse_dialect(value()?)?,
            other => anyhow::bail!("unknown argument for render: {other}"),
        }
    }

    let Some(table) = table else {
        anyhow::bail!("render requires --table");
    };

    Ok(Command::Render(RenderArgs {
        table,
        primary_key,
        select,
        wheres,
        order,
        limit,
        offset,
        dialect,
    }))
}

fn parse_number(flag: &str, v: &str) -> anyhow::Result<u64> {
    v.parse::<u64>()
        .map_err(|_| anyhow::anyhow!("{flag} expects a non-negative integer, got `{v}`"))
}

fn parse_dialect(v: &str) -> anyhow::Result<Dialect> {
    match v.to_ascii_lowercase().as_str() {
        "mysql" => Ok(Dialect::MySql),
        "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
        other => anyhow::bail!("unknown dialect: {other} (expected mysql or postgres)"),
    }
}

pub fn print_help(topic: HelpTopic) {
    match topic {
        HelpTopic::Root => {
            println!(
                "\
tagsql - dynamic SQL builder toolbox

USAGE:
  tagsql <COMMAND> [OPTIONS]

COMMANDS:
  copy          Copy every row of the configured source table into the target table
  render        Print the statement the builder renders for the given clauses

Run `tagsql <command> --help` for more."
            );
        }
        HelpTopic::Copy => {
            println!(
                "\
USAGE:
  tagsql copy [OPTIONS]

OPTIONS:
  --config <FILE>       Config file path (default: tagsql.toml)
  --dry-run             Read and map rows, print the INSERTs without running them
  -h, --help            Print help"
            );
        }
        HelpTopic::Render => {
            println!(
                "\
USAGE:
  tagsql render --table <TABLE> [OPTIONS]

OPTIONS:
  --table <TABLE>       Table the statement reads from (required)
  --pk <COLUMN>         Primary key column (default: id)
  --select <A,B,...>    Select list; may repeat
  --where <SQL>         Raw predicate, ANDed with the others; may repeat
  --order <SQL>         ORDER BY clause
  --limit <N>           LIMIT
  --offset <N>          OFFSET
  --dialect <NAME>      mysql (default) or postgres
  -h, --help            Print help"
            );
        }
    }
}
