//! Lazy, transparently paginated listings.
//!
//! Each iterator fetches one page at a time and stops after the first error. Listings are
//! not restartable; list again from the same prefix to get a fresh sequence.

use crate::errors::CloudError;
use crate::store::{ListPage, ListRequest, ObjectStore};
use crate::uri::folder_prefix;
use std::vec;

struct Pager<'a, S: ?Sized> {
    store: &'a S,
    request: ListRequest,
    continuation: Option<String>,
    exhausted: bool,
}

impl<'a, S: ObjectStore + ?Sized> Pager<'a, S> {
    fn new(store: &'a S, request: ListRequest) -> Self {
        Pager {
            store,
            request,
            continuation: None,
            exhausted: false,
        }
    }

    fn next_page(&mut self) -> Option<Result<ListPage, CloudError>> {
        if self.exhausted {
            return None;
        }
        match self
            .store
            .list_page(&self.request, self.continuation.as_deref())
        {
            Ok(page) => {
                self.continuation = page.next.clone();
                self.exhausted = self.continuation.is_none();
                Some(Ok(page))
            }
            Err(err) => {
                self.exhausted = true;
                Some(Err(err))
            }
        }
    }
}

/// Keys under a prefix ending with a given suffix. See [`list_object_keys`].
pub struct ObjectKeys<'a, S: ?Sized> {
    pager: Pager<'a, S>,
    suffix: String,
    page: vec::IntoIter<String>,
}

impl<'a, S: ObjectStore + ?Sized> Iterator for ObjectKeys<'a, S> {
    type Item = Result<String, CloudError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let suffix = self.suffix.as_str();
            if let Some(key) = self.page.find(|key| key.ends_with(suffix)) {
                return Some(Ok(key));
            }
            match self.pager.next_page()? {
                Ok(page) => self.page = page.keys.into_iter(),
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

/// Immediate subfolders of a prefix. See [`list_immediate_subfolders`].
pub struct Subfolders<'a, S: ?Sized> {
    pager: Pager<'a, S>,
    page: vec::IntoIter<String>,
}

impl<'a, S: ObjectStore + ?Sized> Iterator for Subfolders<'a, S> {
    type Item = Result<String, CloudError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(folder) = self.page.next() {
                return Some(Ok(folder));
            }
            match self.pager.next_page()? {
                Ok(page) => self.page = page.common_prefixes.into_iter(),
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

/// Lazily list every key under `prefix` in `bucket` whose name ends with `suffix`.
pub fn list_object_keys<'a, S: ObjectStore + ?Sized>(
    store: &'a S,
    bucket: &str,
    prefix: &str,
    suffix: &str,
) -> ObjectKeys<'a, S> {
    let request = ListRequest {
        bucket: bucket.to_string(),
        prefix: prefix.to_string(),
        delimiter: None,
    };
    ObjectKeys {
        pager: Pager::new(store, request),
        suffix: suffix.to_string(),
        page: Vec::new().into_iter(),
    }
}

/// Lazily list the "folders" directly under `prefix`, as full key prefixes ending in `/`.
/// A non-empty prefix is treated as a folder even without its trailing `/`.
pub fn list_immediate_subfolders<'a, S: ObjectStore + ?Sized>(
    store: &'a S,
    bucket: &str,
    prefix: &str,
) -> Subfolders<'a, S> {
    let request = ListRequest {
        bucket: bucket.to_string(),
        prefix: folder_prefix(prefix),
        delimiter: Some("/".to_string()),
    };
    Subfolders {
        pager: Pager::new(store, request),
        page: Vec::new().into_iter(),
    }
}
