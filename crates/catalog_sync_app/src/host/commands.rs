//! Line-oriented console input mapped onto core messages.

use anyhow::{anyhow, bail, Context};
use catalog_sync_core::{CursorField, Msg, SearchKey, SortDirection, SortKey};

pub const HELP: &str = "\
Commands:
  start <job_id> [page]        start one job, optionally at a page
  start-all                    start every job
  refresh                      fetch job status now
  hide | show                  pause or resume background polling
  type <text>                  edit the search box (debounced)
  search <text>                submit a search immediately
  next | prev | enter | esc    navigate search results
  pick <n>                     open search result n
  reload                       reload the catalog
  sort <key> [asc|desc]        popularity, title, release, added, runtime
  page <offset>                move by pages, e.g. page +1
  highlight <id|none>          mark the item kept in view on re-sort
  focus <provider> next|last   start editing a settings field
  blur                         stop editing
  discard                      drop unsaved settings edits
  set <provider> next|last <n> edit a settings field
  save                         save settings
  view                         print the current view
  help | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Msg(Msg),
    Render,
    Help,
    Quit,
}

/// Parses one input line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> anyhow::Result<Option<Command>> {
    let line = line.trim_end_matches(['\r', '\n']);
    let trimmed = line.trim_start();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest),
        None => (trimmed, ""),
    };
    let args: Vec<&str> = rest.split_whitespace().collect();

    let command = match verb.to_ascii_lowercase().as_str() {
        "start" => {
            let job_id = args.first().context("usage: start <job_id> [page]")?;
            let start_page = args
                .get(1)
                .map(|page| page.parse::<u32>())
                .transpose()
                .context("start page must be a whole number")?;
            Command::Msg(Msg::JobStartRequested {
                job_id: job_id.to_string(),
                start_page,
            })
        }
        "start-all" => Command::Msg(Msg::StartAllRequested),
        "refresh" => Command::Msg(Msg::JobRefreshRequested),
        "hide" => Command::Msg(Msg::VisibilityChanged { hidden: true }),
        "show" => Command::Msg(Msg::VisibilityChanged { hidden: false }),
        // Search text keeps its inner and trailing spaces as typed.
        "type" => Command::Msg(Msg::SearchInput(rest.to_string())),
        "search" => Command::Msg(Msg::SearchSubmitted(rest.to_string())),
        "next" => Command::Msg(Msg::SearchKey(SearchKey::Next)),
        "prev" => Command::Msg(Msg::SearchKey(SearchKey::Previous)),
        "enter" => Command::Msg(Msg::SearchKey(SearchKey::Enter)),
        "esc" => Command::Msg(Msg::SearchKey(SearchKey::Escape)),
        "pick" => {
            let index: usize = args
                .first()
                .context("usage: pick <n>")?
                .parse::<usize>()
                .context("result number must be a whole number")?;
            if index == 0 {
                bail!("results are numbered from 1");
            }
            Command::Msg(Msg::SearchResultSelected(index - 1))
        }
        "reload" => Command::Msg(Msg::CatalogReloadRequested),
        "sort" => {
            let raw_key = args.first().context("usage: sort <key> [asc|desc]")?;
            let key =
                SortKey::parse(raw_key).ok_or_else(|| anyhow!("unknown sort key: {raw_key}"))?;
            let direction = args.get(1).map(|raw| parse_direction(raw)).transpose()?;
            Command::Msg(Msg::SortRequested { key, direction })
        }
        "page" => {
            let offset: i64 = args
                .first()
                .context("usage: page <offset>")?
                .trim_start_matches('+')
                .parse::<i64>()
                .context("page offset must be a whole number")?;
            Command::Msg(Msg::PageChanged { offset })
        }
        "highlight" => {
            let raw = args.first().context("usage: highlight <id|none>")?;
            let id = match *raw {
                "none" => None,
                raw => Some(raw.parse::<u64>().context("item id must be a whole number")?),
            };
            Command::Msg(Msg::ItemHighlighted(id))
        }
        "focus" => {
            let (provider, field) = provider_field(&args, "usage: focus <provider> next|last")?;
            Command::Msg(Msg::SettingsFieldFocused { provider, field })
        }
        "blur" => Command::Msg(Msg::SettingsFieldBlurred),
        "discard" => Command::Msg(Msg::SettingsEditsDiscarded),
        "set" => {
            let (provider, field) =
                provider_field(&args, "usage: set <provider> next|last <value>")?;
            let value = args.get(2..).map(|parts| parts.join(" ")).unwrap_or_default();
            Command::Msg(Msg::SettingsFieldEdited {
                provider,
                field,
                value,
            })
        }
        "save" => Command::Msg(Msg::SettingsSaveRequested),
        "view" => Command::Render,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => bail!("unknown command: {other} (try 'help')"),
    };
    Ok(Some(command))
}

fn parse_direction(raw: &str) -> anyhow::Result<SortDirection> {
    match raw.to_ascii_lowercase().as_str() {
        "asc" | "ascending" => Ok(SortDirection::Ascending),
        "desc" | "descending" => Ok(SortDirection::Descending),
        other => bail!("unknown sort direction: {other}"),
    }
}

fn provider_field(args: &[&str], usage: &'static str) -> anyhow::Result<(String, CursorField)> {
    let provider = args.first().context(usage)?;
    let field = match args.get(1).map(|raw| raw.to_ascii_lowercase()).as_deref() {
        Some("next") => CursorField::NextPage,
        Some("last") => CursorField::LastPage,
        _ => bail!(usage),
    };
    Ok((provider.to_string(), field))
}
