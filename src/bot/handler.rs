use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::commands::{Command, ParseError};
use crate::monitor::models::MonitorTarget;
use crate::monitor::scheduler::{PollScheduler, SchedulerError};
use crate::monitor::store::{StoreError, TargetStore};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

impl CommandError {
    /// Reply shown to the user when a command could not be applied.
    pub fn user_message(&self) -> String {
        match self {
            CommandError::Store(StoreError::NotFound(name)) => {
                format!("No monitoring target named '{name}'. Use /show to list targets.")
            }
            CommandError::Store(StoreError::NoSelection) => {
                "No monitoring target selected. Use /add or /select first.".to_string()
            }
            CommandError::Scheduler(e) => format!("Could not change the crawling interval: {e}"),
        }
    }
}

const HELP_TEXT: &str = "Available commands:
/add name - add and select a monitoring target
/select name - select an existing target
/delete name - delete a target
/keywords words - search keywords for the selected target
/location postal_code country - search location for the selected target
/price min max - price range for the selected target
/radius km - search radius for the selected target
/interval seconds - how often the marketplace is crawled
/show - list all targets
/selected - show the selected target";

/// Applies chat commands to the target store and the poll scheduler.
#[derive(Clone)]
pub struct CommandHandler {
    store: Arc<TargetStore>,
    scheduler: Arc<PollScheduler>,
}

impl CommandHandler {
    pub fn new(store: Arc<TargetStore>, scheduler: Arc<PollScheduler>) -> Self {
        Self { store, scheduler }
    }

    /// Parses and runs one chat message. `None` means nothing should be sent
    /// back: the text was not a command, or its arguments were malformed.
    pub fn handle_text(&self, text: &str) -> Option<String> {
        match Command::parse(text) {
            Ok(command) => Some(self.reply(command)),
            Err(ParseError::NotACommand) => None,
            Err(e) => {
                debug!(error = %e, "Ignoring command.");
                None
            }
        }
    }

    pub fn reply(&self, command: Command) -> String {
        match self.execute(command) {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Command failed.");
                e.user_message()
            }
        }
    }

    pub fn execute(&self, command: Command) -> Result<String, CommandError> {
        match command {
            Command::Add { name } => {
                self.store.add(&name);
                self.store.select(&name);
                Ok(format!(
                    "Added and selected monitoring target: {name}
You can now configure:
 - marketplace search keywords with /keywords your product search keywords
 - location with /location postal_code country
 - price range with /price min max - optional
 - radius to expand the search to with /radius km - optional"
                ))
            }
            Command::Delete { name } => {
                self.store.delete(&name)?;
                Ok(format!("Deleted monitoring target {name}"))
            }
            Command::Select { name } => {
                self.store.select(&name);
                Ok(format!("Selected target: {}", self.selected_label()))
            }
            Command::Selected => Ok(format!(
                "currently selected target: {}",
                self.selected_label()
            )),
            Command::Interval { seconds } => {
                match self.scheduler.reconfigure(seconds) {
                    Err(SchedulerError::NotRunning) => self.scheduler.start(seconds)?,
                    other => other?,
                }
                info!(interval_secs = seconds, "Crawling interval changed by command.");
                Ok(format!(
                    "configured marketplace crawling interval to: {seconds} seconds"
                ))
            }
            Command::Keywords { keywords } => {
                let name = self.store.selected_or_err()?;
                self.store.set_keywords(&name, &keywords)?;
                Ok(format!("configured search keywords to: {keywords}"))
            }
            Command::Location {
                postal_code,
                country,
            } => {
                let name = self.store.selected_or_err()?;
                self.store.set_location(&name, &postal_code, &country)?;
                Ok(format!("configured location to: {postal_code} {country}"))
            }
            Command::Price { min, max } => {
                let name = self.store.selected_or_err()?;
                self.store.set_price_range(&name, min, max)?;
                Ok(format!("configured price range to: {min} {max}"))
            }
            Command::Radius { km } => {
                let name = self.store.selected_or_err()?;
                self.store.set_radius(&name, km)?;
                Ok(format!("configured search radius to {km} kilometers"))
            }
            Command::Show => Ok(render_targets(&self.store.list())),
            Command::Help => Ok(HELP_TEXT.to_string()),
        }
    }

    fn selected_label(&self) -> String {
        self.store.selected().unwrap_or_else(|| "none".to_string())
    }
}

fn render_targets(targets: &[MonitorTarget]) -> String {
    let mut text = String::from("Currently configured monitoring targets");
    for target in targets {
        text.push_str(&format!("\ntarget: {}", target.name));
        if let Some(keywords) = target.keywords.as_deref().filter(|k| !k.is_empty()) {
            text.push_str(&format!("\nkeywords: {keywords}"));
        }
        if let (Some(postal_code), Some(country)) = (&target.postal_code, &target.country) {
            text.push_str(&format!("\nlocation: {postal_code} {country}"));
        }
        if let (Some(min), Some(max)) = (target.min_price, target.max_price) {
            text.push_str(&format!("\nprice range: {min} {max}"));
        }
        if let Some(radius) = target.radius {
            text.push_str(&format!("\nradius: {radius}"));
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::cycle::tests::{RecordingSender, FakeScanner};
    use crate::monitor::cycle::PollCycle;
    use crate::monitor::query::QueryBuilder;
    use std::time::Duration;

    fn resolve(postal_code: &str, country: &str) -> Option<String> {
        (postal_code == "48013" && country == "IT").then(|| "103824622989212".to_string())
    }

    fn handler() -> (CommandHandler, Arc<TargetStore>, Arc<PollScheduler>) {
        let store = Arc::new(TargetStore::with_resolver(resolve));
        let cycle = PollCycle::new(
            store.clone(),
            QueryBuilder::default(),
            Arc::new(FakeScanner::default()),
            Arc::new(RecordingSender::default()),
        );
        let scheduler = Arc::new(PollScheduler::new(Arc::new(cycle)));
        (
            CommandHandler::new(store.clone(), scheduler.clone()),
            store,
            scheduler,
        )
    }

    #[tokio::test]
    async fn test_add_creates_and_selects() {
        let (handler, store, _) = handler();
        let reply = handler.handle_text("/add road bikes").unwrap();
        assert!(reply.starts_with("Added and selected monitoring target: road bikes\n"));
        assert!(store.contains("road bikes"));
        assert_eq!(store.selected().as_deref(), Some("road bikes"));
    }

    #[tokio::test]
    async fn test_attribute_commands_apply_to_selection() {
        let (handler, store, _) = handler();
        handler.handle_text("/add bikes");
        assert_eq!(
            handler.handle_text("/keywords red bike").as_deref(),
            Some("configured search keywords to: red bike")
        );
        assert_eq!(
            handler.handle_text("/location 48013 IT").as_deref(),
            Some("configured location to: 48013 IT")
        );
        assert_eq!(
            handler.handle_text("/price 10 50").as_deref(),
            Some("configured price range to: 10 50")
        );
        assert_eq!(
            handler.handle_text("/radius 5").as_deref(),
            Some("configured search radius to 5 kilometers")
        );

        let target = store.get("bikes").unwrap();
        assert!(target.is_valid());
        assert_eq!(target.location_id.as_deref(), Some("103824622989212"));
        assert_eq!((target.min_price, target.max_price, target.radius), (Some(10), Some(50), Some(5)));
    }

    #[tokio::test]
    async fn test_malformed_arguments_produce_no_reply_and_no_change() {
        let (handler, store, _) = handler();
        handler.handle_text("/add bikes");
        assert_eq!(handler.handle_text("/price 10"), None);
        assert_eq!(handler.handle_text("/location 48013"), None);
        assert_eq!(handler.handle_text("/radius far"), None);
        assert_eq!(handler.handle_text("/interval soon"), None);
        assert_eq!(handler.handle_text("just chatting"), None);

        let target = store.get("bikes").unwrap();
        assert_eq!(
            target,
            MonitorTarget {
                id: target.id,
                ..MonitorTarget::new("bikes")
            }
        );
    }

    #[tokio::test]
    async fn test_delete_unknown_target_is_reported() {
        let (handler, _, _) = handler();
        assert_eq!(
            handler.handle_text("/delete ghost").as_deref(),
            Some("No monitoring target named 'ghost'. Use /show to list targets.")
        );
    }

    #[tokio::test]
    async fn test_mutating_deleted_selection_is_reported() {
        let (handler, store, _) = handler();
        handler.handle_text("/add bikes");
        assert_eq!(
            handler.handle_text("/delete bikes").as_deref(),
            Some("Deleted monitoring target bikes")
        );
        assert!(store.is_empty());
        assert_eq!(
            handler.handle_text("/keywords lamp").as_deref(),
            Some("No monitoring target named 'bikes'. Use /show to list targets.")
        );
    }

    #[tokio::test]
    async fn test_mutating_without_selection_is_reported() {
        let (handler, _, _) = handler();
        assert_eq!(
            handler.handle_text("/radius 3").as_deref(),
            Some("No monitoring target selected. Use /add or /select first.")
        );
    }

    #[tokio::test]
    async fn test_select_echoes_current_selection() {
        let (handler, _, _) = handler();
        assert_eq!(
            handler.handle_text("/select nope").as_deref(),
            Some("Selected target: none")
        );
        handler.handle_text("/add a");
        handler.handle_text("/add b");
        assert_eq!(
            handler.handle_text("/select a").as_deref(),
            Some("Selected target: a")
        );
        assert_eq!(
            handler.handle_text("/select nope").as_deref(),
            Some("Selected target: a")
        );
        assert_eq!(
            handler.handle_text("/selected").as_deref(),
            Some("currently selected target: a")
        );
    }

    #[tokio::test]
    async fn test_show_lists_populated_fields_in_order() {
        let (handler, _, _) = handler();
        handler.handle_text("/add bikes");
        handler.handle_text("/keywords red bike");
        handler.handle_text("/location 48013 IT");
        handler.handle_text("/price 10 50");
        handler.handle_text("/add lamps");
        handler.handle_text("/radius 7");

        assert_eq!(
            handler.handle_text("/show").as_deref(),
            Some(
                "Currently configured monitoring targets\n\
                 target: bikes\n\
                 keywords: red bike\n\
                 location: 48013 IT\n\
                 price range: 10 50\n\
                 target: lamps\n\
                 radius: 7"
            )
        );
    }

    #[tokio::test]
    async fn test_interval_reconfigures_running_scheduler() {
        let (handler, _, scheduler) = handler();
        scheduler.start(60).unwrap();
        assert_eq!(
            handler.handle_text("/interval 30").as_deref(),
            Some("configured marketplace crawling interval to: 30 seconds")
        );
        assert_eq!(scheduler.interval(), Some(Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn test_interval_starts_idle_scheduler() {
        let (handler, _, scheduler) = handler();
        handler.handle_text("/interval 15");
        assert_eq!(scheduler.interval(), Some(Duration::from_secs(15)));
    }
}
