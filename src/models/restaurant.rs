// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Restaurant model, used both for nearby listings and as the selected
//! destination.

use crate::models::Coordinate;
use serde::{Deserialize, Serialize};

/// A restaurant returned by the nearby lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restaurant {
    /// Backend restaurant ID
    pub id: String,
    /// Display name
    pub name: String,
    /// Entrance location
    pub coordinate: Coordinate,
    /// Street address, when known
    #[serde(default)]
    pub address: Option<String>,
    /// Cuisine label (e.g. "Thai")
    #[serde(default)]
    pub cuisine: Option<String>,
    /// Average rating (0-5)
    #[serde(default)]
    pub rating: Option<f64>,
}
