use serde::Deserialize;
use uniconnect_core::{ConnectError, ConnectResult, ConnectionType, Profile, TagCategory};
use validator::Validate;

/// Number that may arrive as JSON text, e.g. a form select sending `"12+"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumericField {
    Number(f64),
    Text(String),
}

impl NumericField {
    fn value(&self, field: &str) -> ConnectResult<f64> {
        match self {
            NumericField::Number(value) => Ok(*value),
            NumericField::Text(text) => text
                .trim()
                .trim_end_matches('+')
                .replace(',', ".")
                .parse::<f64>()
                .map_err(|_| ConnectError::validation(format!("{} must be a number, got {:?}", field, text))),
        }
    }
}

/// Profile submission. Accepts camelCase names and the Portuguese form names.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitProfileRequest {
    #[validate(length(min = 1))]
    pub id: String,
    #[serde(alias = "nomeCompleto", alias = "nome", default)]
    pub full_name: String,
    #[serde(alias = "curso", default)]
    pub course: String,
    #[serde(alias = "semestre")]
    pub semester: NumericField,
    #[serde(alias = "tempoFormatura")]
    pub years_to_graduation: NumericField,
    #[serde(alias = "trabalhando", alias = "trabalha", default)]
    pub employed: bool,
    #[serde(alias = "interessesProfissionais", default)]
    pub professional_interests: Vec<String>,
    #[serde(default)]
    pub hobbies: Vec<String>,
    #[serde(alias = "esportes", default)]
    pub sports: Vec<String>,
    #[serde(alias = "estilosMusical", alias = "estilosMusicais", default)]
    pub music_styles: Vec<String>,
    #[serde(alias = "prefereSair", default)]
    pub prefers_going_out: bool,
    #[serde(alias = "locaisLazer", alias = "locaisSaida", default)]
    pub leisure_venues: Vec<String>,
    #[serde(alias = "tipoConexoes", alias = "tipoConexoesDesejadas", default)]
    pub connection_types: Vec<ConnectionType>,
}

impl SubmitProfileRequest {
    /// Convert into a core profile. Range checks are left to the engine.
    pub fn into_profile(self) -> ConnectResult<Profile> {
        self.validate()?;

        let semester = self.semester.value("semester")?;
        if semester.fract() != 0.0 || !(0.0..=f64::from(u32::MAX)).contains(&semester) {
            return Err(ConnectError::validation(format!(
                "semester must be a whole number, got {}",
                semester
            )));
        }

        let mut profile = Profile::new(self.id, self.full_name, self.course)
            .with_semester(semester as u32)
            .with_years_to_graduation(self.years_to_graduation.value("years to graduation")?)
            .with_employed(self.employed)
            .with_tags(TagCategory::ProfessionalInterests, self.professional_interests)
            .with_tags(TagCategory::Hobbies, self.hobbies)
            .with_tags(TagCategory::Sports, self.sports)
            .with_tags(TagCategory::MusicStyles, self.music_styles)
            .with_tags(TagCategory::LeisureVenues, self.leisure_venues)
            .with_connection_types(self.connection_types);
        profile.prefers_going_out = self.prefers_going_out;

        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_payload_with_portuguese_names() {
        let raw = r#"{
            "id": "ana@uni.br",
            "nomeCompleto": "Ana Souza",
            "curso": "Direito",
            "semestre": "12+",
            "tempoFormatura": "1,5",
            "trabalhando": true,
            "interessesProfissionais": ["Advocacia"],
            "hobbies": ["Leitura", "Leitura", "Filmes"],
            "esportes": [],
            "estilosMusical": ["MPB"],
            "prefereSair": true,
            "locaisLazer": ["Bar"],
            "tipoConexoes": ["Amizades", "Oportunidades Profissionais"]
        }"#;
        let request: SubmitProfileRequest = serde_json::from_str(raw).unwrap();
        let profile = request.into_profile().unwrap();

        assert_eq!(profile.id.as_str(), "ana@uni.br");
        assert_eq!(profile.course, "Direito");
        assert_eq!(profile.semester, 12);
        assert_eq!(profile.years_to_graduation, 1.5);
        assert!(profile.employed);
        assert_eq!(profile.hobbies.len(), 2);
        assert!(profile.prefers_going_out);
        assert_eq!(profile.connection_types.len(), 2);
        assert!(profile.validate_submission().is_ok());
    }

    #[test]
    fn test_camel_case_payload() {
        let raw = r#"{
            "id": "b",
            "fullName": "Bruno",
            "course": "Law",
            "semester": 3,
            "yearsToGraduation": 2.5,
            "connectionTypes": ["dating"]
        }"#;
        let profile = serde_json::from_str::<SubmitProfileRequest>(raw)
            .unwrap()
            .into_profile()
            .unwrap();
        assert_eq!(profile.semester, 3);
        assert!(!profile.prefers_going_out);
        assert!(profile.connection_types.contains(&ConnectionType::Dating));
    }

    #[test]
    fn test_bad_numbers_are_validation_errors() {
        let fractional = r#"{"id": "c", "course": "Law", "semester": 2.5, "yearsToGraduation": 2}"#;
        let err = serde_json::from_str::<SubmitProfileRequest>(fractional)
            .unwrap()
            .into_profile()
            .unwrap_err();
        assert!(matches!(err, ConnectError::Validation { .. }));

        let text = r#"{"id": "c", "course": "Law", "semester": "third", "yearsToGraduation": 2}"#;
        let err = serde_json::from_str::<SubmitProfileRequest>(text)
            .unwrap()
            .into_profile()
            .unwrap_err();
        assert!(matches!(err, ConnectError::Validation { .. }));

        let blank_id = r#"{"id": "", "course": "Law", "semester": 1, "yearsToGraduation": 2}"#;
        let err = serde_json::from_str::<SubmitProfileRequest>(blank_id)
            .unwrap()
            .into_profile()
            .unwrap_err();
        assert!(matches!(err, ConnectError::Validation { .. }));
    }
}
