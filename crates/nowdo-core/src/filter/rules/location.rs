//! Hides tasks that can only be done somewhere the user is not.

use std::sync::Arc;

use tracing::warn;

use super::LOCATION_PRIORITY;
use crate::context::Context;
use crate::filter::{FilterFamily, FilterRule, RuleDecision};
use crate::geo;
use crate::location::Location;
use crate::sources::LocationSource;
use crate::task::Task;

pub struct LocationRule {
    locations: Arc<dyn LocationSource>,
}

impl LocationRule {
    pub const NAME: &'static str = "location";

    pub fn new(locations: Arc<dyn LocationSource>) -> Self {
        Self { locations }
    }

    fn resolve(&self, task: &Task) -> Vec<Location> {
        task.required_location_ids
            .iter()
            .filter_map(|id| match self.locations.location(id) {
                Ok(found) => found,
                Err(e) => {
                    warn!(task_id = %task.id, location_id = %id, error = %e, "location lookup failed");
                    None
                }
            })
            .collect()
    }
}

impl FilterRule for LocationRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn priority(&self) -> i32 {
        LOCATION_PRIORITY
    }

    fn family(&self) -> Option<FilterFamily> {
        Some(FilterFamily::Location)
    }

    fn apply(&self, context: &Context, task: &Task) -> RuleDecision {
        if task.required_location_ids.is_empty() {
            return RuleDecision::visible("no location requirement");
        }

        let required = self.resolve(task);
        let Some(point) = context.position else {
            // Without coordinates, an explicit named location stands in for them.
            if let Some(current) = &context.current_location_id {
                if task.required_location_ids.iter().any(|id| id == current) {
                    return RuleDecision::visible(format!("at required location {current}"));
                }
            }
            let names: Vec<&str> = required.iter().map(|l| l.name.as_str()).collect();
            return RuleDecision::hidden(if names.is_empty() {
                "no current position and required locations are unknown".to_string()
            } else {
                format!("no current position; requires one of: {}", names.join(", "))
            });
        };

        if let Some(hit) = required.iter().find(|loc| geo::within_radius(&point, loc)) {
            return RuleDecision::visible(format!(
                "within {:.0}m of '{}' (radius {:.0}m)",
                hit.distance_from(&point),
                hit.name,
                hit.radius_meters
            ));
        }

        if required.is_empty() {
            return RuleDecision::hidden("required locations are unknown");
        }

        let distances: Vec<String> = required
            .iter()
            .map(|loc| format!("'{}' is {:.0}m away", loc.name, loc.distance_from(&point)))
            .collect();
        RuleDecision::hidden(format!(
            "not at a required location: {}",
            distances.join(", ")
        ))
    }
}
