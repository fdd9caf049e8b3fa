/*
Copyright 2024, Zep Software, Inc.

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! Student profiles as submitted by the front-end.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::errors::ConnectResult;

pub const MIN_SEMESTER: u32 = 1;
pub const MIN_YEARS_TO_GRADUATION: f64 = 0.5;
pub const MAX_YEARS_TO_GRADUATION: f64 = 10.0;

static NO_TAGS: BTreeSet<String> = BTreeSet::new();

/// Stable identity of a profile. Ordering drives every deterministic
/// iteration in the engine.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(String);

impl ProfileId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProfileId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ProfileId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Kind of connection a student is looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    #[serde(alias = "Friendship", alias = "Amizades")]
    Friendship,
    #[serde(
        alias = "ProfessionalOpportunity",
        alias = "Professional Opportunity",
        alias = "Oportunidades Profissionais"
    )]
    ProfessionalOpportunity,
    #[serde(alias = "Dating", alias = "Dates")]
    Dating,
}

/// Set-valued profile categories. Lets callers pick a tag set without
/// knowing field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagCategory {
    ProfessionalInterests,
    Hobbies,
    Sports,
    MusicStyles,
    LeisureVenues,
}

/// A student profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Profile {
    #[validate(custom(function = "validate_identity"))]
    pub id: ProfileId,
    pub full_name: String,
    #[validate(custom(function = "validate_course"))]
    pub course: String,
    #[validate(range(min = 1, message = "semester must be at least 1"))]
    pub semester: u32,
    #[validate(custom(function = "validate_years_to_graduation"))]
    pub years_to_graduation: f64,
    #[serde(default)]
    pub employed: bool,
    #[serde(default)]
    pub professional_interests: BTreeSet<String>,
    #[serde(default)]
    pub hobbies: BTreeSet<String>,
    #[serde(default)]
    pub sports: BTreeSet<String>,
    #[serde(default)]
    pub music_styles: BTreeSet<String>,
    #[serde(default)]
    pub prefers_going_out: bool,
    #[serde(default)]
    pub leisure_venues: BTreeSet<String>,
    #[validate(custom(function = "validate_connection_types"))]
    pub connection_types: BTreeSet<ConnectionType>,
    #[serde(default = "Utc::now")]
    pub submitted_at: DateTime<Utc>,
}

impl Profile {
    /// Profile with the required fields set and everything else empty.
    /// Defaults to first semester, four years left and friendship.
    pub fn new(id: impl Into<ProfileId>, full_name: impl Into<String>, course: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            full_name: full_name.into(),
            course: course.into(),
            semester: MIN_SEMESTER,
            years_to_graduation: 4.0,
            employed: false,
            professional_interests: BTreeSet::new(),
            hobbies: BTreeSet::new(),
            sports: BTreeSet::new(),
            music_styles: BTreeSet::new(),
            prefers_going_out: false,
            leisure_venues: BTreeSet::new(),
            connection_types: BTreeSet::from([ConnectionType::Friendship]),
            submitted_at: Utc::now(),
        }
    }

    pub fn with_semester(mut self, semester: u32) -> Self {
        self.semester = semester;
        self
    }

    pub fn with_years_to_graduation(mut self, years: f64) -> Self {
        self.years_to_graduation = years;
        self
    }

    pub fn with_employed(mut self, employed: bool) -> Self {
        self.employed = employed;
        self
    }

    pub fn with_tags<I, T>(mut self, category: TagCategory, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        *self.tags_mut(category) = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_going_out<I, T>(mut self, venues: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.prefers_going_out = true;
        self.leisure_venues = venues.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_connection_types<I>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = ConnectionType>,
    {
        self.connection_types = types.into_iter().collect();
        self
    }

    /// Raw tag set for a category.
    pub fn tags(&self, category: TagCategory) -> &BTreeSet<String> {
        match category {
            TagCategory::ProfessionalInterests => &self.professional_interests,
            TagCategory::Hobbies => &self.hobbies,
            TagCategory::Sports => &self.sports,
            TagCategory::MusicStyles => &self.music_styles,
            TagCategory::LeisureVenues => &self.leisure_venues,
        }
    }

    pub fn tags_mut(&mut self, category: TagCategory) -> &mut BTreeSet<String> {
        match category {
            TagCategory::ProfessionalInterests => &mut self.professional_interests,
            TagCategory::Hobbies => &mut self.hobbies,
            TagCategory::Sports => &mut self.sports,
            TagCategory::MusicStyles => &mut self.music_styles,
            TagCategory::LeisureVenues => &mut self.leisure_venues,
        }
    }

    /// Tag set as it takes part in similarity. Leisure venues only count
    /// for students who prefer going out.
    pub fn comparable_tags(&self, category: TagCategory) -> &BTreeSet<String> {
        match category {
            TagCategory::LeisureVenues if !self.prefers_going_out => &NO_TAGS,
            _ => self.tags(category),
        }
    }

    /// Check the submission rules. A failing profile must never reach the store.
    pub fn validate_submission(&self) -> ConnectResult<()> {
        self.validate()?;
        Ok(())
    }
}

fn validate_identity(id: &ProfileId) -> Result<(), ValidationError> {
    if id.as_str().trim().is_empty() {
        return Err(ValidationError::new("required").with_message("identity is required".into()));
    }
    Ok(())
}

fn validate_course(course: &str) -> Result<(), ValidationError> {
    if course.trim().is_empty() {
        return Err(ValidationError::new("required").with_message("course is required".into()));
    }
    Ok(())
}

fn validate_years_to_graduation(years: f64) -> Result<(), ValidationError> {
    if !years.is_finite() || !(MIN_YEARS_TO_GRADUATION..=MAX_YEARS_TO_GRADUATION).contains(&years) {
        return Err(ValidationError::new("range").with_message(
            format!(
                "years to graduation must be between {} and {}",
                MIN_YEARS_TO_GRADUATION, MAX_YEARS_TO_GRADUATION
            )
            .into(),
        ));
    }
    Ok(())
}

fn validate_connection_types(types: &BTreeSet<ConnectionType>) -> Result<(), ValidationError> {
    if types.is_empty() {
        return Err(ValidationError::new("length")
            .with_message("at least one connection type is required".into()));
    }
    Ok(())
}
