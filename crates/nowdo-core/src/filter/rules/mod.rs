//! Built-in filter rules.
//!
//! | rule       | priority | hides a task when                                  |
//! |------------|----------|----------------------------------------------------|
//! | dependency | 110      | a prerequisite is unmet or the graph has a cycle   |
//! | time       | 100      | its estimate exceeds the available minutes         |
//! | location   | 90       | the user is not at any of its required locations   |
//! | focus      | 80       | it needs focus and the social setting prevents it  |
//! | energy     | 70       | its effort floor exceeds the current energy        |

pub mod dependency;
pub mod energy;
pub mod focus;
pub mod location;
pub mod time;

pub use dependency::DependencyRule;
pub use energy::EnergyRule;
pub use focus::FocusRule;
pub use location::LocationRule;
pub use time::TimeRule;

pub const DEPENDENCY_PRIORITY: i32 = 110;
pub const TIME_PRIORITY: i32 = 100;
pub const LOCATION_PRIORITY: i32 = 90;
pub const FOCUS_PRIORITY: i32 = 80;
pub const ENERGY_PRIORITY: i32 = 70;
