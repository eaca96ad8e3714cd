use std::{collections::HashMap, sync::Arc};

use anyhow::{anyhow, bail, Result};
use chrono::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    api::{
        entities::{
            Activity, ActivityPatch, EntryPatch, EntryRange, NewActivity, NewTag, NewTimeEntry,
            Tag, TimeEntry,
        },
        ApiClient,
    },
    utils::clock::Clock,
    validation,
};

use super::QueryCache;

/// Read side is cached per query, write side invalidates what it touched. Commands only talk to
/// the backend through this.
pub struct Repository {
    api: ApiClient,
    clock: Arc<dyn Clock>,
    activities: QueryCache<bool, Vec<Activity>>,
    tags: QueryCache<(), Vec<Tag>>,
    active: QueryCache<(), Option<TimeEntry>>,
    entries: QueryCache<EntryRange, Vec<TimeEntry>>,
}

impl Repository {
    pub fn new(api: ApiClient, clock: Arc<dyn Clock>, stale_after: Duration) -> Self {
        Self {
            activities: QueryCache::new("activities", stale_after, clock.clone()),
            tags: QueryCache::new("tags", stale_after, clock.clone()),
            active: QueryCache::new("active entry", stale_after, clock.clone()),
            entries: QueryCache::new("entries", stale_after, clock.clone()),
            api,
            clock,
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub async fn activities(&self, include_archived: bool) -> Result<Vec<Activity>> {
        Ok(self
            .activities
            .get_or_fetch(include_archived, || {
                self.api.list_activities(include_archived)
            })
            .await?)
    }

    /// Id to name for every activity, archived ones included.
    pub async fn activity_names(&self) -> Result<HashMap<Uuid, String>> {
        Ok(self
            .activities(true)
            .await?
            .into_iter()
            .map(|a| (a.id, a.name))
            .collect())
    }

    /// Finds an activity by id or by case-insensitive name. Active activities win over archived
    /// ones with the same name.
    pub async fn resolve_activity(&self, query: &str) -> Result<Activity> {
        let activities = self.activities(true).await?;
        find_activity(&activities, query)
    }

    /// Finds a tag by id or by case-insensitive name.
    pub async fn resolve_tag(&self, query: &str) -> Result<Tag> {
        let tags = self.tags().await?;
        find_tag(&tags, query)
    }

    pub async fn tags(&self) -> Result<Vec<Tag>> {
        Ok(self.tags.get_or_fetch((), || self.api.list_tags()).await?)
    }

    pub async fn active_entry(&self) -> Result<Option<TimeEntry>> {
        Ok(self
            .active
            .get_or_fetch((), || self.api.active_entry())
            .await?)
    }

    pub async fn entries(&self, range: EntryRange) -> Result<Vec<TimeEntry>> {
        let mut entries = self
            .entries
            .get_or_fetch(range, || self.api.list_entries(&range))
            .await?;
        entries.sort_by(|a, b| a.start.cmp(&b.start));
        Ok(entries)
    }

    pub async fn create_activity(&self, name: &str) -> Result<Activity> {
        let name = validation::activity_name(name)?;
        let activity = self.api.create_activity(&NewActivity { name }).await?;
        self.activities.invalidate_all();
        info!("Created activity {}", activity.id);
        Ok(activity)
    }

    pub async fn rename_activity(&self, id: Uuid, name: &str) -> Result<Activity> {
        let name = validation::activity_name(name)?;
        let activity = self
            .api
            .update_activity(
                id,
                &ActivityPatch {
                    name: Some(name),
                    ..Default::default()
                },
            )
            .await?;
        self.activities.invalidate_all();
        Ok(activity)
    }

    pub async fn set_archived(&self, id: Uuid, archived: bool) -> Result<Activity> {
        let activity = self.api.set_activity_archived(id, archived).await?;
        self.activities.invalidate_all();
        Ok(activity)
    }

    pub async fn delete_activity(&self, id: Uuid) -> Result<()> {
        self.api.delete_activity(id).await?;
        self.activities.invalidate_all();
        self.entries.invalidate_all();
        self.active.invalidate_all();
        Ok(())
    }

    /// Starts a timer. A timer that is already running is stopped first and returned too.
    pub async fn start_timer(&self, activity: &Activity) -> Result<(TimeEntry, Option<TimeEntry>)> {
        if activity.is_archived() {
            bail!("Activity {} is archived", activity.name);
        }
        let stopped = match self.active_entry().await? {
            Some(running) if running.activity_id == activity.id => {
                bail!("{} is already being tracked", activity.name)
            }
            Some(running) => {
                let stopped = self.api.stop_timer(running.id).await?;
                self.invalidate_entries();
                Some(stopped)
            }
            None => None,
        };
        let started = self.api.start_timer(activity.id).await?;
        self.invalidate_entries();
        debug!("Started entry {}", started.id);
        Ok((started, stopped))
    }

    /// Stops the running timer, if there is one.
    pub async fn stop_timer(&self) -> Result<Option<TimeEntry>> {
        let Some(running) = self.active_entry().await? else {
            return Ok(None);
        };
        let stopped = self.api.stop_timer(running.id).await?;
        self.invalidate_entries();
        Ok(Some(stopped))
    }

    pub async fn create_entry(&self, entry: NewTimeEntry) -> Result<TimeEntry> {
        validation::entry_span(entry.start, entry.stop, self.clock.time())?;
        let entry = NewTimeEntry {
            rating: entry.rating.map(validation::rating).transpose()?,
            comment: entry
                .comment
                .as_deref()
                .map(validation::comment)
                .transpose()?
                .filter(|c| !c.is_empty()),
            tags: validation::tag_list(&entry.tags)?,
            distractions: entry.distractions.map(validation::distractions).transpose()?,
            ..entry
        };
        let created = self.api.create_entry(&entry).await?;
        self.invalidate_entries();
        Ok(created)
    }

    pub async fn annotate_entry(&self, id: Uuid, patch: EntryPatch) -> Result<TimeEntry> {
        if patch.is_empty() {
            bail!("Nothing to update");
        }
        let patch = EntryPatch {
            rating: patch.rating.map(validation::rating).transpose()?,
            comment: patch
                .comment
                .as_deref()
                .map(validation::comment)
                .transpose()?,
            tags: patch.tags.as_deref().map(validation::tag_list).transpose()?,
            distractions: patch.distractions.map(validation::distractions).transpose()?,
        };
        let updated = self.api.update_entry(id, &patch).await?;
        self.invalidate_entries();
        Ok(updated)
    }

    pub async fn delete_entry(&self, id: Uuid) -> Result<()> {
        self.api.delete_entry(id).await?;
        self.invalidate_entries();
        Ok(())
    }

    pub async fn create_tag(&self, name: &str) -> Result<Tag> {
        let name = validation::tag_name(name)?;
        let tag = self.api.create_tag(&NewTag { name }).await?;
        self.tags.invalidate_all();
        Ok(tag)
    }

    pub async fn delete_tag(&self, id: Uuid) -> Result<()> {
        self.api.delete_tag(id).await?;
        self.tags.invalidate_all();
        Ok(())
    }

    fn invalidate_entries(&self) {
        self.active.invalidate_all();
        self.entries.invalidate_all();
    }
}

/// Case-insensitive name comparison, Unicode aware.
fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

fn find_tag(tags: &[Tag], query: &str) -> Result<Tag> {
    let query = query.trim();
    tags.iter()
        .find(|t| t.id.to_string() == query)
        .or_else(|| tags.iter().find(|t| same_name(&t.name, query)))
        .cloned()
        .ok_or_else(|| anyhow!("No tag matches {query}"))
}

fn find_activity(activities: &[Activity], query: &str) -> Result<Activity> {
    let query = query.trim();
    if let Ok(id) = Uuid::parse_str(query) {
        if let Some(activity) = activities.iter().find(|a| a.id == id) {
            return Ok(activity.clone());
        }
    }
    let mut matches = activities
        .iter()
        .filter(|a| same_name(&a.name, query))
        .collect::<Vec<_>>();
    matches.sort_by_key(|a| a.is_archived());
    match matches.as_slice() {
        [] => Err(anyhow!("No activity named {query}")),
        [only] => Ok((*only).clone()),
        [first, second, ..] if first.is_archived() == second.is_archived() => Err(anyhow!(
            "Several activities are named {query}, use the id instead"
        )),
        [first, ..] => Ok((*first).clone()),
    }
}
