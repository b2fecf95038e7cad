//! Message bodies for outbound email.

use super::Notification;

/// Notification sent to the admin mailbox when a business submits its
/// onboarding details.
pub fn admin_submission_notification(
    admin_email: &str,
    business_name: &str,
    contact_email: &str,
    submission_id: &str,
) -> Notification {
    let subject = format!("New onboarding submission: {business_name}");

    let html_body = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px;">
  <h2 style="color: #2c3e50;">New Onboarding Submission</h2>
  <p>A business has completed the onboarding wizard and is ready for review.</p>
  <table style="border-collapse: collapse; width: 100%;">
    <tr>
      <td style="padding: 8px; border: 1px solid #ddd;"><strong>Business</strong></td>
      <td style="padding: 8px; border: 1px solid #ddd;">{business_name}</td>
    </tr>
    <tr>
      <td style="padding: 8px; border: 1px solid #ddd;"><strong>Contact email</strong></td>
      <td style="padding: 8px; border: 1px solid #ddd;">{contact_email}</td>
    </tr>
    <tr>
      <td style="padding: 8px; border: 1px solid #ddd;"><strong>Submission id</strong></td>
      <td style="padding: 8px; border: 1px solid #ddd;">{submission_id}</td>
    </tr>
  </table>
  <h3 style="color: #2c3e50;">Next steps</h3>
  <ol>
    <li>Review the submitted business profile and voice agent configuration.</li>
    <li>Contact the business owner to schedule activation.</li>
  </ol>
</div>"#
    );

    let text_body = format!(
        "New onboarding submission\n\n\
         Business: {business_name}\n\
         Contact email: {contact_email}\n\
         Submission id: {submission_id}\n\n\
         Review the submission and contact the business owner to schedule activation.\n"
    );

    Notification {
        recipient: admin_email.to_string(),
        subject,
        html_body,
        text_body,
    }
}

/// Password-reset code email sent to the account holder.
pub fn password_reset_code(email: &str, name: &str, code: &str) -> Notification {
    let html_body = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px;">
  <h2 style="color: #2c3e50;">Password Reset Request</h2>
  <p>Hi {name},</p>
  <p>We received a request to reset your password. Use the code below to continue:</p>
  <p style="font-size: 28px; font-weight: bold; letter-spacing: 4px; color: #2c3e50;">{code}</p>
  <p>This code expires in 15 minutes. If you did not request a reset, you can safely ignore this email.</p>
</div>"#
    );

    let text_body = format!(
        "Hi {name},\n\n\
         We received a request to reset your password. Your reset code is:\n\n\
         {code}\n\n\
         This code expires in 15 minutes. If you did not request a reset, you can\n\
         safely ignore this email.\n"
    );

    Notification {
        recipient: email.to_string(),
        subject: "Your password reset code".to_string(),
        html_body,
        text_body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_notification_carries_submission_details() {
        let n = admin_submission_notification(
            "admin@x.com",
            "Summit Roofing",
            "owner@summit.com",
            "4t-ABC2026-01-15",
        );
        assert_eq!(n.recipient, "admin@x.com");
        assert!(n.subject.contains("Summit Roofing"));
        assert!(n.html_body.contains("4t-ABC2026-01-15"));
        assert!(n.text_body.contains("owner@summit.com"));
    }

    #[test]
    fn reset_email_contains_code() {
        let n = password_reset_code("alice@x.com", "Alice", "123456");
        assert_eq!(n.recipient, "alice@x.com");
        assert!(n.html_body.contains("123456"));
        assert!(n.text_body.contains("123456"));
        assert!(n.text_body.contains("15 minutes"));
    }
}
