use warp::{reject::Rejection, Filter};

use crate::{
    actions::authenticate,
    error::{Error, ErrorKind},
    permissions::Owner,
    schema::User,
    state::{with_state, State},
};

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub struct SessionData {
    pub user: User,
}

impl SessionData {
    pub fn owner(&self) -> Owner {
        Owner::from(&self.user)
    }
}

/// Accepts `Token <jwt>` and `Bearer <jwt>`.
fn parse_authorization(header: Option<String>) -> Result<String, Error> {
    let header = header.ok_or_else(|| ErrorKind::Unauthorized.default())?;

    match header.trim().split_once(' ') {
        Some((scheme, token))
            if (scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer"))
                && !token.trim().is_empty() =>
        {
            Ok(token.trim().to_string())
        }
        _ => Err(ErrorKind::Unauthorized.new("Invalid token header")),
    }
}

pub fn with_session(
    state: State,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(with_state(state))
        .and_then(|header: Option<String>, state: State| async move {
            let token = parse_authorization(header)?;
            let user = authenticate(state.store.as_ref(), &state.keys, &token).await?;

            Ok::<_, Rejection>(SessionData { user })
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_both_schemes() {
        assert_eq!(parse_authorization(Some("Token abc".into())).unwrap(), "abc");
        assert_eq!(parse_authorization(Some("Bearer abc".into())).unwrap(), "abc");
        assert_eq!(parse_authorization(Some("token  abc ".into())).unwrap(), "abc");
    }

    #[test]
    fn rejects_missing_or_malformed_headers() {
        for header in [None, Some("abc".to_string()), Some("Basic abc".to_string()), Some("Token ".to_string())] {
            assert_eq!(parse_authorization(header).unwrap_err().code, 401);
        }
    }
}
