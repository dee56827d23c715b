//! Email bodies

use super::Email;

/// Languages with a translated verification mail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    En,
    Ko,
}

impl Language {
    /// Pick a language from an `Accept-Language` header, English otherwise
    pub fn from_accept_language(header: Option<&str>) -> Self {
        let Some(header) = header else {
            return Language::En;
        };
        let primary = header
            .split(',')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if primary.starts_with("ko") {
            Language::Ko
        } else {
            Language::En
        }
    }
}

pub fn verification_link(client_domain: &str, token: &str) -> String {
    format!(
        "{}/email-verify?token={}",
        client_domain.trim_end_matches('/'),
        token
    )
}

pub fn verification_email(to: &str, link: &str, language: Language) -> Email {
    let (subject, html) = match language {
        Language::En => (
            "Verify Your Email",
            format!(
                "Click here to verify your email: <a href=\"{}\">Verify Email</a>",
                link
            ),
        ),
        Language::Ko => (
            "이메일 인증",
            format!(
                "이메일 인증을 위해 여기를 클릭하세요: <a href=\"{}\">이메일 인증</a>",
                link
            ),
        ),
    };

    Email {
        to: to.to_string(),
        subject: subject.to_string(),
        html,
    }
}

pub fn invitation_email(to: &str, workspace_name: &str, role: &str, client_domain: &str) -> Email {
    let link = format!("{}/invitations", client_domain.trim_end_matches('/'));
    Email {
        to: to.to_string(),
        subject: format!("You have been invited to {}", workspace_name),
        html: format!(
            "You have been invited to join <b>{}</b> as {}. \
             <a href=\"{}\">Open your invitations</a>",
            workspace_name, role, link
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_selection() {
        assert_eq!(Language::from_accept_language(None), Language::En);
        assert_eq!(Language::from_accept_language(Some("ko-KR,ko;q=0.9")), Language::Ko);
        assert_eq!(Language::from_accept_language(Some("en-US,ko;q=0.5")), Language::En);
        assert_eq!(Language::from_accept_language(Some("fr")), Language::En);
    }

    #[test]
    fn test_verification_link() {
        assert_eq!(
            verification_link("http://app.test/", "abc"),
            "http://app.test/email-verify?token=abc"
        );
    }

    #[test]
    fn test_templates_embed_link() {
        let mail = verification_email("a@b.c", "http://x/y", Language::Ko);
        assert_eq!(mail.subject, "이메일 인증");
        assert!(mail.html.contains("href=\"http://x/y\""));
    }
}
