use axum::Json;

use rabbit_types::api::{CrisisLine, CrisisResources, ResourcesResponse, SupportResource};

fn support(name: &str, website: &str, description: &str) -> SupportResource {
    SupportResource {
        name: name.to_string(),
        website: website.to_string(),
        description: description.to_string(),
    }
}

/// Crisis lines and general mental-health organisations.
pub fn directory() -> ResourcesResponse {
    ResourcesResponse {
        crisis: CrisisResources {
            national_suicide_prevention: CrisisLine {
                name: "National Suicide Prevention Lifeline".into(),
                phone: Some("988".into()),
                text: None,
                website: "https://988lifeline.org/".into(),
            },
            crisis_text_line: CrisisLine {
                name: "Crisis Text Line".into(),
                phone: None,
                text: Some("Text HOME to 741741".into()),
                website: "https://www.crisistextline.org/".into(),
            },
        },
        general: vec![
            support(
                "National Alliance on Mental Illness (NAMI)",
                "https://www.nami.org/",
                "Education, support, and advocacy for mental health",
            ),
            support(
                "Mental Health America",
                "https://www.mhanational.org/",
                "Resources and tools for mental wellness",
            ),
        ],
    }
}

pub async fn list_resources() -> Json<ResourcesResponse> {
    Json(directory())
}
