use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::errors::Error;
use crate::session::VerifiedPatient;

/// Nonce/state length: 24 alphanumeric characters, ~143 bits.
const CHALLENGE_LEN: usize = 24;

const VERIFY_SCOPE: &str = "openid profile";
const VERIFY_ACR_VALUES: &str = "patient-identity";

fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Anti-replay pair generated fresh for every verification attempt.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Challenge {
    pub nonce: String,
    pub state: String,
}

impl Challenge {
    pub fn generate() -> Self {
        Self {
            nonce: random_token(CHALLENGE_LEN),
            state: random_token(CHALLENGE_LEN),
        }
    }
}

/// Parameter block handed to the external identity-assertion widget.
#[derive(Clone, Debug, Serialize, Eq, PartialEq)]
pub struct VerificationRequest {
    pub client_id: String,
    pub redirect_uri: String,
    pub nonce: String,
    pub state: String,
    pub scope: String,
    pub acr_values: String,
}

/// Success callback payload from the identity authority.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct VerificationCallback {
    #[serde(alias = "patientId")]
    pub sub: String,
    pub name: String,
    pub birthdate: Option<String>,
    pub state: String,
    pub nonce: String,
}

/// Gate in front of every prescription-affecting action.
///
/// `begin` always generates a fresh challenge, replacing any pending one;
/// `complete` consumes the pending challenge, so a replayed callback is
/// refused. A failed round trip never touches a previously verified
/// patient - the gate only returns the new assertion, and the caller
/// decides when to apply it to the session.
pub struct VerificationGate {
    client_id: String,
    redirect_uri: String,
    pending: Option<Challenge>,
}

impl VerificationGate {
    pub fn new(config: &Config) -> Self {
        Self {
            client_id: config.verify_client_id.clone(),
            redirect_uri: config.verify_redirect_uri.clone(),
            pending: None,
        }
    }

    /// Initiate a verification round trip.
    pub fn begin(&mut self) -> VerificationRequest {
        let challenge = Challenge::generate();
        let request = VerificationRequest {
            client_id: self.client_id.clone(),
            redirect_uri: self.redirect_uri.clone(),
            nonce: challenge.nonce.clone(),
            state: challenge.state.clone(),
            scope: VERIFY_SCOPE.to_string(),
            acr_values: VERIFY_ACR_VALUES.to_string(),
        };
        self.pending = Some(challenge);
        request
    }

    /// Complete the round trip. Consumes the pending challenge whatever
    /// the outcome.
    pub fn complete(&mut self, callback: VerificationCallback) -> Result<VerifiedPatient, Error> {
        let challenge = self
            .pending
            .take()
            .ok_or_else(|| Error::verification("No verification in progress"))?;

        if callback.state != challenge.state || callback.nonce != challenge.nonce {
            return Err(Error::verification(
                "Stale or mismatched verification response",
            ));
        }

        if callback.sub.trim().is_empty() {
            return Err(Error::verification("Verification returned no patient id"));
        }

        tracing::info!(patient_id = %callback.sub, "patient identity verified");

        Ok(VerifiedPatient {
            id: callback.sub,
            name: callback.name,
            birthday: callback.birthdate,
        })
    }

    /// Record an authority-reported failure, discarding the pending
    /// challenge.
    pub fn fail(&mut self, reason: &str) -> Error {
        self.pending = None;
        Error::verification(format!("Identity verification failed: {reason}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> VerificationGate {
        VerificationGate {
            client_id: "client".to_string(),
            redirect_uri: "http://localhost/cb".to_string(),
            pending: None,
        }
    }

    fn callback_for(request: &VerificationRequest) -> VerificationCallback {
        VerificationCallback {
            sub: "P1".to_string(),
            name: "Jane".to_string(),
            birthdate: None,
            state: request.state.clone(),
            nonce: request.nonce.clone(),
        }
    }

    #[test]
    fn challenges_are_fresh_and_long_enough() {
        let a = Challenge::generate();
        let b = Challenge::generate();
        assert!(a.nonce.len() >= 16 && a.state.len() >= 16);
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.state, b.state);
        assert_ne!(a.nonce, a.state);
    }

    #[test]
    fn successful_round_trip_yields_verified_patient() {
        let mut gate = gate();
        let request = gate.begin();
        assert_eq!(request.scope, VERIFY_SCOPE);

        let patient = gate.complete(callback_for(&request)).unwrap();
        assert_eq!(patient.id, "P1");
        assert_eq!(patient.name, "Jane");
    }

    #[test]
    fn replayed_callback_is_refused() {
        let mut gate = gate();
        let request = gate.begin();
        let callback = callback_for(&request);

        gate.complete(callback.clone()).unwrap();
        // The challenge was consumed.
        assert!(matches!(
            gate.complete(callback),
            Err(Error::Verification { .. })
        ));
    }

    #[test]
    fn stale_challenge_is_refused_after_reopen() {
        let mut gate = gate();
        let first = gate.begin();
        // Reopening the modal regenerates the challenge.
        let _second = gate.begin();

        assert!(gate.complete(callback_for(&first)).is_err());
    }

    #[test]
    fn authority_failure_discards_the_challenge() {
        let mut gate = gate();
        let request = gate.begin();

        let err = gate.fail("user closed the widget");
        assert!(matches!(err, Error::Verification { .. }));
        // The old challenge is gone; its callback can no longer complete.
        assert!(gate.complete(callback_for(&request)).is_err());
    }

    #[test]
    fn mismatched_nonce_is_refused() {
        let mut gate = gate();
        let request = gate.begin();
        let mut callback = callback_for(&request);
        callback.nonce = "forged".to_string();

        assert!(gate.complete(callback).is_err());
    }
}
