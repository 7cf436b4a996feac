use derive_new::new;
use reqwest::Client;
use serde_json::json;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq)]
pub struct Mail {
        pub name: String,
        pub email: String,
        pub subject: String,
        pub content: String,
}

/// Outbound transactional mail. Delivery is fire-and-forget.
pub trait Mailer: Send + Sync {
        fn send_mail(&self, mail: Mail);
}

#[derive(new, Debug, Clone)]
pub struct HttpMailService {
        client: Client,
        api_url: String,
        api_key: String,
        sender: String,
}

impl Mailer for HttpMailService {
        fn send_mail(&self, mail: Mail) {
                let request = self
                        .client
                        .post(&self.api_url)
                        .bearer_auth(&self.api_key)
                        .json(&json!({
                            "personalizations": [{ "to": [{ "email": mail.email, "name": mail.name }] }],
                            "from": { "email": self.sender },
                            "subject": mail.subject,
                            "content": [{ "type": "text/html", "value": mail.content }],
                        }));

                tokio::spawn(async move {
                        match request.send().await.and_then(|response| response.error_for_status()) {
                                Ok(_) => info!("sent mail to {}", mail.email),
                                Err(err) => error!("failed to send mail to {}: {}", mail.email, err),
                        }
                });
        }
}

/// Welcome mail in pt-br, the platform's default locale.
pub fn welcome_mail(display_name: &str, email: &str, password: Option<&str>) -> Mail {
        let credentials = password
                .map(|password| format!("<p>Seu acesso: <b>{email}</b> / <b>{password}</b></p>"))
                .unwrap_or_default();

        Mail {
                name: display_name.to_string(),
                email: email.to_string(),
                subject: format!("Bem-vindo ao Playmaker, {display_name}!"),
                content: format!(
                        "<p>Olá {display_name},</p>\
                         <p>Sua conta foi criada com sucesso. Convide seus amigos e monte seu time!</p>\
                         {credentials}\
                         <p>Equipe Playmaker</p>"
                ),
        }
}
