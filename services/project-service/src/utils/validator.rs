// /project-management/services/project-service/src/utils/validator.rs

use validator::ValidationErrors;

use crate::{
    models::ValidationError,
    utils::error::{AppError, AppResult},
};

/// Parse a numeric path id, `label` names the id in the error message
pub fn validate_id(raw: &str, label: &str) -> AppResult<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| AppError::BadRequest(format!("{} has an invalid format.", label)))
}

/// Custom validator rejecting empty and whitespace-only strings
pub fn not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("blank"));
    }
    Ok(())
}

/// Flatten validator output into field errors sorted by field name
pub fn collect_validation_errors(errors: &ValidationErrors) -> Vec<ValidationError> {
    let mut collected: Vec<ValidationError> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, field_errors)| {
            let field = to_camel_case(field);
            field_errors.iter().map(move |error| ValidationError {
                field: field.clone(),
                message: error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field)),
            })
        })
        .collect();

    collected.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.message.cmp(&b.message)));
    collected
}

/// Run derive validation and convert failures to a 400 error
pub fn validate_request<T: validator::Validate>(payload: &T) -> AppResult<()> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(collect_validation_errors(&e)))
}

fn to_camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EmployeeAssignmentDto;

    #[test]
    fn test_validate_id() {
        assert_eq!(validate_id("42", "Project ID").unwrap(), 42);

        let err = validate_id("abc", "Project ID").unwrap_err();
        assert_eq!(err.to_string(), "Project ID has an invalid format.");
    }

    #[test]
    fn test_not_blank() {
        assert!(not_blank("Java").is_ok());
        assert!(not_blank("").is_err());
        assert!(not_blank("  \t").is_err());
    }

    #[test]
    fn test_camel_case_field_names() {
        assert_eq!(to_camel_case("responsible_employee_id"), "responsibleEmployeeId");
        assert_eq!(to_camel_case("designation"), "designation");
    }

    #[test]
    fn test_collect_sorted_errors() {
        let dto = EmployeeAssignmentDto {
            employee_id: None,
            qualification: " ".to_string(),
        };

        match validate_request(&dto) {
            Err(AppError::Validation(errors)) => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors[0].field, "employeeId");
                assert_eq!(errors[0].message, "Employee ID is required");
                assert_eq!(errors[1].field, "qualification");
                assert_eq!(errors[1].message, "Qualification is required");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
