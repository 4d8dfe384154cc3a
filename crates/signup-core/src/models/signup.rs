use serde::Serialize;

/// Fields of the sign-up form, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    FirstName,
    LastName,
    State,
    City,
    Email,
    Password,
}

impl FormField {
    pub const ALL: [FormField; 6] = [
        FormField::FirstName,
        FormField::LastName,
        FormField::State,
        FormField::City,
        FormField::Email,
        FormField::Password,
    ];

    /// Get the display label for this field.
    pub fn label(&self) -> &'static str {
        match self {
            FormField::FirstName => "First Name",
            FormField::LastName => "Last Name",
            FormField::State => "State",
            FormField::City => "City",
            FormField::Email => "Email",
            FormField::Password => "Password",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidField {
    pub field: FormField,
    pub message: String,
}

impl std::fmt::Display for InvalidField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field.label(), self.message)
    }
}

/// Editable sign-up form state.
#[derive(Clone, Default)]
pub struct SignUpForm {
    pub first_name: String,
    pub last_name: String,
    pub state: String,
    pub city: String,
    pub email: String,
    pub password: String,
}

impl SignUpForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a state. The city belongs to the previous state, so it is cleared.
    pub fn select_state(&mut self, state: &str) {
        self.state = state.to_string();
        self.city.clear();
    }

    pub fn select_city(&mut self, city: &str) {
        self.city = city.to_string();
    }

    fn value(&self, field: FormField) -> &str {
        match field {
            FormField::FirstName => &self.first_name,
            FormField::LastName => &self.last_name,
            FormField::State => &self.state,
            FormField::City => &self.city,
            FormField::Email => &self.email,
            FormField::Password => &self.password,
        }
    }

    /// Check required fields and produce a registration.
    ///
    /// Every field is required. The email must have a non-empty local part
    /// and domain around a single `@`.
    pub fn submit(&self) -> Result<Registration, Vec<InvalidField>> {
        let mut invalid: Vec<InvalidField> = FormField::ALL
            .iter()
            .filter(|field| self.value(**field).trim().is_empty())
            .map(|field| InvalidField {
                field: *field,
                message: "is required".to_string(),
            })
            .collect();

        let email = self.email.trim();
        if !email.is_empty() && !is_plausible_email(email) {
            invalid.push(InvalidField {
                field: FormField::Email,
                message: "is not a valid email address".to_string(),
            });
        }

        if !invalid.is_empty() {
            return Err(invalid);
        }

        Ok(Registration {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            state: self.state.clone(),
            city: self.city.clone(),
            email: email.to_string(),
            password: self.password.clone(),
        })
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// A completed sign-up. The password is never serialized or printed.
#[derive(Clone, Serialize)]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub state: String,
    pub city: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("state", &self.state)
            .field("city", &self.city)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}
