use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// File upload sent to the storage endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadRequest {
    /// Destination folder, e.g. `machines/videos`
    pub path: String,
    pub file_name: String,
    pub content_type: String,
    pub data: String,  // Base64-encoded file bytes
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub public_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
}

/// Machine fields shared by sell listings and buy requests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineDetails {
    pub machine_name: String,
    pub machine_type_id: String,
    pub payoff_nos: Option<u32>,
    pub payoff_size: String,
    pub main_motor_capacity: String,
    pub line_speed_max_size: String,
    pub expected_daily_production: String,
    pub manufacturing_location: String,
    pub whatsapp_number: String,
    pub is_urgent: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellMachineRequest {
    pub user_id: String,
    #[serde(flatten)]
    pub details: MachineDetails,
    pub video_urls: Vec<String>,
    pub material_specification_url: String,
    pub production_image_urls: Vec<String>,
    pub other_options: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyMachineRequest {
    pub user_id: String,
    #[serde(flatten)]
    pub details: MachineDetails,
    pub notes: String,
    pub production_image_urls: Vec<String>,
}

/// Candidate fields of the team application form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicantDetails {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: String,
    pub location: String,
    /// Years of experience
    pub experience: u32,
    pub education: String,
    /// Comma separated
    pub skills: String,
    pub experience_details: String,
    pub linkedin: String,
    pub portfolio: String,
    pub cover_letter: String,
    pub salary: String,
    pub notice_period: String,
    #[serde(rename = "references_")]
    pub references: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamApplicationRequest {
    #[serde(flatten)]
    pub applicant: ApplicantDetails,
    pub resume_url: String,
    pub video_url: String,
}

/// Material requirement posted on the marketplace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemandDetails {
    pub title: String,
    pub description: String,
    pub category: String,
    pub specifications: String,
    pub required_quantity: String,
    pub unit: String,
    pub location: String,
    pub delivery_deadline: String,
    pub additional_requirements: String,
    pub is_urgent: bool,
    /// Raw material
    pub rm: String,
    #[serde(rename = "type")]
    pub demand_type: String,
    pub payment_terms: String,
    pub whatsapp_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandRequest {
    pub user_id: String,
    #[serde(flatten)]
    pub details: DemandDetails,
    pub image_url: Vec<String>,
}

/// A machine listing as returned by the backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineListing {
    pub id: String,
    pub machine_name: Option<String>,
    pub machine_type_id: Option<String>,
    pub manufacturing_location: Option<String>,
    #[serde(default)]
    pub is_urgent: bool,
    pub whatsapp_number: Option<String>,
    #[serde(default)]
    pub video_urls: Vec<String>,
    #[serde(default)]
    pub production_image_urls: Vec<String>,
}

/// Which side of the machines marketplace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingKind {
    Sell,
    Buy,
}

impl ListingKind {
    pub fn path(self) -> &'static str {
        match self {
            ListingKind::Sell => "sell",
            ListingKind::Buy => "buy",
        }
    }
}
