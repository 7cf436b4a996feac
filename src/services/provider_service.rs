use derive_new::new;
use reqwest::Client;
use serde::Deserialize;
use tracing::{error, info};
use url::Url;

use crate::errors::problem::Problem;
use crate::models::{Provider, ProviderIdentity};

const FACEBOOK_PROFILE_URL: &str = "https://graph.facebook.com/me";
const GOOGLE_PROFILE_URL: &str = "https://www.googleapis.com/userinfo/v2/me";

type ProfileResult = Result<ProviderIdentity, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Deserialize, Debug)]
struct FacebookPictureData {
        url: String,
}

#[derive(Deserialize, Debug)]
struct FacebookPicture {
        data: FacebookPictureData,
}

#[derive(Deserialize, Debug)]
struct FacebookProfile {
        id: String,
        name: Option<String>,
        email: String,
        picture: Option<FacebookPicture>,
}

#[derive(Deserialize, Debug)]
struct GoogleProfile {
        id: String,
        name: Option<String>,
        email: String,
        picture: Option<String>,
}

/// Resolves provider access tokens into the identity they belong to.
#[derive(new, Debug, Clone)]
pub struct ProviderService {
        client: Client,
}

impl ProviderService {
        pub async fn fetch_identity(&self, provider: Provider, access_token: &str) -> Result<ProviderIdentity, Problem> {
                info!("fetching {} profile", provider);

                let identity = match provider {
                        Provider::Facebook => self.fetch_facebook(access_token).await,
                        Provider::Google => self.fetch_google(access_token).await,
                };

                identity.map_err(|err| {
                        error!("failed to fetch {} profile: {}", provider, err);
                        Problem::Unauthorized(format!("invalid {} access token", provider))
                })
        }

        async fn fetch_facebook(&self, access_token: &str) -> ProfileResult {
                let url = Url::parse_with_params(
                        FACEBOOK_PROFILE_URL,
                        &[("fields", "id,name,email,picture"), ("access_token", access_token)],
                )?;

                let profile = self
                        .client
                        .get(url)
                        .send()
                        .await?
                        .error_for_status()?
                        .json::<FacebookProfile>()
                        .await?;

                Ok(ProviderIdentity {
                        provider: Provider::Facebook,
                        id: profile.id,
                        email: profile.email,
                        name: profile.name,
                        picture: profile.picture.map(|picture| picture.data.url),
                })
        }

        async fn fetch_google(&self, access_token: &str) -> ProfileResult {
                let profile = self
                        .client
                        .get(GOOGLE_PROFILE_URL)
                        .bearer_auth(access_token)
                        .send()
                        .await?
                        .error_for_status()?
                        .json::<GoogleProfile>()
                        .await?;

                Ok(ProviderIdentity {
                        provider: Provider::Google,
                        id: profile.id,
                        email: profile.email,
                        name: profile.name,
                        picture: profile.picture,
                })
        }
}
