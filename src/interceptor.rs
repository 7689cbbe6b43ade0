//! Request interceptors.
//!
//! Interceptors run once per call, in the order they were registered, after the
//! request template has been built from the arguments and before it is bound to
//! the target.

use crate::template::RequestTemplate;

/// Mutates a request template before it is sent.
///
/// Closures taking `&mut RequestTemplate` are interceptors.
///
/// # Examples
///
/// ```
/// use courier::template::RequestTemplate;
/// use courier::RequestInterceptor;
///
/// let trace = |template: &mut RequestTemplate| {
///     template.header("X-Trace", ["on"]);
/// };
///
/// let mut template = RequestTemplate::new();
/// trace.apply(&mut template);
/// assert_eq!(template.headers().first("x-trace"), Some("on"));
/// ```
pub trait RequestInterceptor: Send + Sync {
    fn apply(&self, template: &mut RequestTemplate);
}

impl<F> RequestInterceptor for F
where
    F: Fn(&mut RequestTemplate) + Send + Sync,
{
    fn apply(&self, template: &mut RequestTemplate) {
        self(template)
    }
}

/// Adds a fixed header to every request.
#[derive(Debug, Clone)]
pub struct HeaderInterceptor {
    name: String,
    values: Vec<String>,
}

impl HeaderInterceptor {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: vec![value.into()],
        }
    }
}

impl RequestInterceptor for HeaderInterceptor {
    fn apply(&self, template: &mut RequestTemplate) {
        template.header(&self.name, &self.values);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_interceptor_appends() {
        let mut template = RequestTemplate::new();
        template.header("Accept", ["text/plain"]);
        HeaderInterceptor::new("accept", "application/json").apply(&mut template);

        assert_eq!(
            template.headers().get("Accept").unwrap(),
            &["text/plain".to_string(), "application/json".to_string()]
        );
    }
}
