//! Unsigned statements and the 5-tuple reduction between them.

use crate::auth::Auth;
use crate::principal::{Name, Principal, Subject};
use crate::tag::Tag;
use crate::validity::Validity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Two statements that do not reduce to a single one.
///
/// The search hits this constantly; it carries only a static reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("incompatible certificates: {reason}")]
pub struct Incompatible {
    /// Why the reduction failed
    pub reason: &'static str,
}

impl Incompatible {
    const fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// Fields every statement has
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CertBody {
    /// Who makes the statement
    pub issuer: Principal,
    /// Who or what the statement is about
    pub subject: Subject,
    /// When the statement holds; `None` means always
    pub validity: Option<Validity>,
    /// Display hint
    pub display: Option<String>,
    /// Free-form comment, ignored by implication
    pub comment: Option<String>,
}

impl CertBody {
    /// Create a body with no validity, display or comment
    #[must_use]
    pub fn new(issuer: Principal, subject: impl Into<Subject>) -> Self {
        Self {
            issuer,
            subject: subject.into(),
            validity: None,
            display: None,
            comment: None,
        }
    }

    fn implies(&self, other: &CertBody) -> bool {
        self.issuer == other.issuer
            && self.subject == other.subject
            && Validity::implies(self.validity.as_ref(), other.validity.as_ref())
            && self.display == other.display
    }
}

/// `issuer` grants `auth` to `subject`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AuthCert {
    /// Common statement fields
    pub body: CertBody,
    /// The grant
    pub auth: Auth,
}

/// `issuer`'s local name `name` refers to `subject`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NameCert {
    /// Common statement fields
    pub body: CertBody,
    /// The local name being defined
    pub name: String,
}

impl NameCert {
    /// The name this certificate defines, `issuer name`
    #[must_use]
    pub fn full_name(&self) -> Name {
        Name::local(self.body.issuer.clone(), self.name.clone())
    }
}

/// An unsigned statement
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cert {
    /// Authorization statement
    Auth(AuthCert),
    /// Name definition
    Name(NameCert),
}

impl Cert {
    /// An authorization certificate
    #[must_use]
    pub fn auth(issuer: Principal, subject: impl Into<Subject>, tag: Tag, propagate: bool) -> Self {
        Self::Auth(AuthCert {
            body: CertBody::new(issuer, subject),
            auth: Auth::new(tag, propagate),
        })
    }

    /// A name certificate
    #[must_use]
    pub fn name(issuer: Principal, name: impl Into<String>, subject: impl Into<Subject>) -> Self {
        Self::Name(NameCert {
            body: CertBody::new(issuer, subject),
            name: name.into(),
        })
    }

    /// Set the validity
    #[must_use]
    pub fn with_validity(mut self, validity: Validity) -> Self {
        self.body_mut().validity = Some(validity);
        self
    }

    /// Set the display hint
    #[must_use]
    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.body_mut().display = Some(display.into());
        self
    }

    /// Set the comment
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.body_mut().comment = Some(comment.into());
        self
    }

    /// Common statement fields
    #[must_use]
    pub fn body(&self) -> &CertBody {
        match self {
            Self::Auth(c) => &c.body,
            Self::Name(c) => &c.body,
        }
    }

    fn body_mut(&mut self) -> &mut CertBody {
        match self {
            Self::Auth(c) => &mut c.body,
            Self::Name(c) => &mut c.body,
        }
    }

    /// Who makes the statement
    #[must_use]
    pub fn issuer(&self) -> &Principal {
        &self.body().issuer
    }

    /// Who the statement is about
    #[must_use]
    pub fn subject(&self) -> &Subject {
        &self.body().subject
    }

    /// The authorization, for auth certificates
    #[must_use]
    pub fn as_auth(&self) -> Option<&AuthCert> {
        match self {
            Self::Auth(c) => Some(c),
            Self::Name(_) => None,
        }
    }

    /// The name definition, for name certificates
    #[must_use]
    pub fn as_name(&self) -> Option<&NameCert> {
        match self {
            Self::Name(c) => Some(c),
            Self::Auth(_) => None,
        }
    }

    /// Whether this statement is at least as strong as `other`.
    ///
    /// Same kind, issuer, subject and display; validity and authorization
    /// (or name) must imply. Comments are ignored.
    #[must_use]
    pub fn implies(&self, other: &Cert) -> bool {
        match (self, other) {
            (Self::Auth(a), Self::Auth(b)) => a.body.implies(&b.body) && a.auth.implies(&b.auth),
            (Self::Name(a), Self::Name(b)) => a.body.implies(&b.body) && a.name == b.name,
            _ => false,
        }
    }

    /// 5-tuple reduction of `self` followed by `next`.
    ///
    /// # Errors
    ///
    /// Returns [`Incompatible`] when the pair does not reduce.
    pub fn compose(&self, next: &Cert) -> Result<Cert, Incompatible> {
        match (self, next) {
            (Self::Name(a), Self::Name(b)) => Ok(Self::Name(NameCert {
                body: reduce_name(&a.body, b)?,
                name: a.name.clone(),
            })),
            (Self::Auth(a), Self::Name(b)) => Ok(Self::Auth(AuthCert {
                body: reduce_name(&a.body, b)?,
                auth: a.auth.clone(),
            })),
            (Self::Auth(a), Self::Auth(b)) => reduce_auth(a, b).map(Self::Auth),
            (Self::Name(_), Self::Auth(_)) => {
                Err(Incompatible::new("a name certificate cannot be followed by an authorization"))
            }
        }
    }
}

/// Rewrite `body`'s subject through the name defined by `def`.
fn reduce_name(body: &CertBody, def: &NameCert) -> Result<CertBody, Incompatible> {
    let name = body
        .subject
        .as_name()
        .ok_or(Incompatible::new("subject is not a name"))?;
    let rest = name
        .strip_prefix(&def.full_name())
        .ok_or(Incompatible::new("name certificate does not define the subject's prefix"))?;

    let subject = if rest.is_empty() {
        def.body.subject.clone()
    } else {
        match &def.body.subject {
            Subject::Principal(p) => Subject::Name(
                Name::new(p.clone(), rest.to_vec())
                    .map_err(|_| Incompatible::new("empty name suffix"))?,
            ),
            Subject::Name(n) => Subject::Name(n.extended(rest)),
            Subject::Threshold(_) | Subject::ObjectHash(_) => {
                return Err(Incompatible::new("cannot resolve a name suffix through a non-principal"));
            }
        }
    };

    Ok(CertBody {
        issuer: body.issuer.clone(),
        subject,
        validity: overlap(body.validity.as_ref(), def.body.validity.as_ref())?,
        display: None,
        comment: None,
    })
}

fn overlap(a: Option<&Validity>, b: Option<&Validity>) -> Result<Option<Validity>, Incompatible> {
    let validity = Validity::intersect_opt(a, b);
    if validity.as_ref().is_some_and(Validity::is_empty) {
        return Err(Incompatible::new("validity periods do not overlap"));
    }
    Ok(validity)
}

fn reduce_auth(a: &AuthCert, b: &AuthCert) -> Result<AuthCert, Incompatible> {
    if !a.auth.propagate {
        return Err(Incompatible::new("authorization does not propagate"));
    }
    if a.body.subject.as_principal() != Some(&b.body.issuer) {
        return Err(Incompatible::new("subject does not issue the next authorization"));
    }
    let tag = a.auth.tag.intersect(&b.auth.tag);
    if tag.is_null() {
        return Err(Incompatible::new("authorization tags do not intersect"));
    }
    Ok(AuthCert {
        body: CertBody {
            issuer: a.body.issuer.clone(),
            subject: b.body.subject.clone(),
            validity: overlap(a.body.validity.as_ref(), b.body.validity.as_ref())?,
            display: None,
            comment: None,
        },
        auth: Auth::new(tag, b.auth.propagate),
    })
}

impl fmt::Display for Cert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auth(c) => write!(f, "(cert {} -> {} {})", c.body.issuer, c.body.subject, c.auth),
            Self::Name(c) => write!(
                f,
                "(cert (name {} {}) -> {})",
                c.body.issuer, c.name, c.body.subject
            ),
        }
    }
}
