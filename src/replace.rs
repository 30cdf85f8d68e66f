// Copyright 2023 The urlcanon developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Partial component overrides applied to an existing canonical URL.

/// One component override: leave alone, substitute, or delete.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Override<'a> {
    /// Keep the base URL's component.
    Keep,
    /// Substitute this text (canonicalized on application).
    Set(&'a str),
    /// Remove the component entirely.
    Clear,
}

impl<'a> Default for Override<'a> {
    fn default() -> Override<'a> {
        Override::Keep
    }
}

/// A set of component overrides for [`Url::replace_components`].
///
/// The scheme is special: changing it splices the new scheme onto the old
/// URL text and re-parses the result under the new scheme's rules, so it
/// can be set but not cleared.
///
/// [`Url::replace_components`]: crate::Url::replace_components
///
/// ```
/// use urlcanon::{Replacements, Url};
///
/// let url = Url::parse("http://example.com/dir/file?q#f");
/// let replaced = url.replace_components(Replacements::new().set_host("other.org").clear_query());
/// assert_eq!(replaced.spec(), "http://other.org/dir/file#f");
/// ```
#[derive(Copy, Clone, Default, Debug)]
pub struct Replacements<'a> {
    pub(crate) scheme: Option<&'a str>,
    pub(crate) username: Override<'a>,
    pub(crate) password: Override<'a>,
    pub(crate) host: Override<'a>,
    pub(crate) port: Override<'a>,
    pub(crate) path: Override<'a>,
    pub(crate) query: Override<'a>,
    pub(crate) fragment: Override<'a>,
}

impl<'a> Replacements<'a> {
    pub fn new() -> Replacements<'a> {
        Replacements::default()
    }

    pub fn set_scheme(mut self, scheme: &'a str) -> Replacements<'a> {
        self.scheme = Some(scheme);
        self
    }

    pub fn set_username(mut self, username: &'a str) -> Replacements<'a> {
        self.username = Override::Set(username);
        self
    }

    pub fn clear_username(mut self) -> Replacements<'a> {
        self.username = Override::Clear;
        self
    }

    pub fn set_password(mut self, password: &'a str) -> Replacements<'a> {
        self.password = Override::Set(password);
        self
    }

    pub fn clear_password(mut self) -> Replacements<'a> {
        self.password = Override::Clear;
        self
    }

    pub fn set_host(mut self, host: &'a str) -> Replacements<'a> {
        self.host = Override::Set(host);
        self
    }

    pub fn clear_host(mut self) -> Replacements<'a> {
        self.host = Override::Clear;
        self
    }

    pub fn set_port(mut self, port: &'a str) -> Replacements<'a> {
        self.port = Override::Set(port);
        self
    }

    pub fn clear_port(mut self) -> Replacements<'a> {
        self.port = Override::Clear;
        self
    }

    pub fn set_path(mut self, path: &'a str) -> Replacements<'a> {
        self.path = Override::Set(path);
        self
    }

    pub fn clear_path(mut self) -> Replacements<'a> {
        self.path = Override::Clear;
        self
    }

    pub fn set_query(mut self, query: &'a str) -> Replacements<'a> {
        self.query = Override::Set(query);
        self
    }

    pub fn clear_query(mut self) -> Replacements<'a> {
        self.query = Override::Clear;
        self
    }

    pub fn set_fragment(mut self, fragment: &'a str) -> Replacements<'a> {
        self.fragment = Override::Set(fragment);
        self
    }

    pub fn clear_fragment(mut self) -> Replacements<'a> {
        self.fragment = Override::Clear;
        self
    }

    /// The same overrides minus the scheme; used once a scheme change has
    /// been spliced in and the rest must be re-applied under the new
    /// scheme's category.
    pub(crate) fn without_scheme(mut self) -> Replacements<'a> {
        self.scheme = None;
        self
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.scheme.is_none()
            && self.username == Override::Keep
            && self.password == Override::Keep
            && self.host == Override::Keep
            && self.port == Override::Keep
            && self.path == Override::Keep
            && self.query == Override::Keep
            && self.fragment == Override::Keep
    }
}
