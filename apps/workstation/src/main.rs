use std::sync::Arc;

use workflow::catalog::Catalog;
use workflow::records::HttpRecordsClient;
use workflow::session::{FileSessionStore, Role, SessionContext, SessionStore};
use workflow::verify::VerificationGate;
use workflow::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .without_time()
        .init();

    let config = Config::from_env();
    let store = FileSessionStore::new(config.session_file.clone());

    // Restore the previous session so a restart does not force
    // re-verification; otherwise start a fresh pharmacist session.
    let session = match store.load()? {
        Some(session) => {
            tracing::info!(
                practitioner_id = %session.practitioner_id,
                "session restored"
            );
            session
        }
        None => {
            let practitioner_id =
                std::env::var("PRACTITIONER_ID").unwrap_or("pharmacist-local".to_string());
            let practitioner_name =
                std::env::var("PRACTITIONER_NAME").unwrap_or("Local Pharmacist".to_string());
            SessionContext::new(Role::Pharmacist, &practitioner_id, &practitioner_name)
        }
    };

    let api = Arc::new(HttpRecordsClient::new(&config)?);
    let catalog = Catalog::new(api);

    match session.verified_patient() {
        Some(patient) => {
            tracing::info!(patient_id = %patient.id, name = %patient.name, "verified patient present");
            match catalog.for_patient(&session).await {
                Ok(prescriptions) => {
                    tracing::info!("{} prescription(s) on record", prescriptions.len());
                    for rx in &prescriptions {
                        tracing::info!(
                            prescription_id = %rx.id,
                            medication = %rx.medication_name,
                            status = rx.status.as_str(),
                            "prescription"
                        );
                    }
                }
                Err(err) => {
                    // Render-empty-plus-error contract: report and move on.
                    tracing::error!("catalog fetch failed: {}", err.user_message());
                }
            }
        }
        None => {
            let mut gate = VerificationGate::new(&config);
            let request = gate.begin();
            tracing::info!(
                client_id = %request.client_id,
                state = %request.state,
                "no verified patient; initiate identity verification with these parameters"
            );
        }
    }

    store.save(&session)?;
    Ok(())
}
