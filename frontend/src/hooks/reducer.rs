//! Pure cache patching. Mutations and pushed events both describe a change
//! to one record; `reduce` applies that change to whatever shape a cached
//! query holds. Applying the same change twice gives the same result for
//! every shape, page totals included. Pages after the first are left as
//! they are on a create; the new record's position there is only known
//! after a refetch.

use shared::models::Entity;
use shared::PaginatedResult;

/// A change to one record of a resource
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceChange<T> {
    Created(T),
    Updated(T),
    Deleted(String),
}

impl<T: Entity> ResourceChange<T> {
    pub fn id(&self) -> &str {
        match self {
            ResourceChange::Created(record) | ResourceChange::Updated(record) => record.id(),
            ResourceChange::Deleted(id) => id,
        }
    }
}

/// The shapes a resource's queries are cached as
#[derive(Debug, Clone, PartialEq)]
pub enum QueryData<T> {
    Detail(T),
    List(Vec<T>),
    Page(PaginatedResult<T>),
}

impl<T> QueryData<T> {
    pub fn into_detail(self) -> Option<T> {
        match self {
            QueryData::Detail(record) => Some(record),
            _ => None,
        }
    }

    pub fn into_list(self) -> Option<Vec<T>> {
        match self {
            QueryData::List(records) => Some(records),
            _ => None,
        }
    }

    pub fn into_page(self) -> Option<PaginatedResult<T>> {
        match self {
            QueryData::Page(page) => Some(page),
            _ => None,
        }
    }
}

/// Apply `change` to one cached result. `None` means the entry should be
/// evicted (the record a detail query held was deleted).
pub fn reduce<T>(change: &ResourceChange<T>, data: QueryData<T>) -> Option<QueryData<T>>
where
    T: Entity + Clone,
{
    match data {
        QueryData::Detail(record) => reduce_detail(change, record).map(QueryData::Detail),
        QueryData::List(records) => Some(QueryData::List(reduce_list(change, records).0)),
        QueryData::Page(page) => Some(QueryData::Page(reduce_page(change, page))),
    }
}

fn reduce_detail<T: Entity + Clone>(change: &ResourceChange<T>, record: T) -> Option<T> {
    if change.id() != record.id() {
        return Some(record);
    }
    match change {
        ResourceChange::Created(next) | ResourceChange::Updated(next) => Some(next.clone()),
        ResourceChange::Deleted(_) => None,
    }
}

/// Returns the new list and the change in its length
fn reduce_list<T: Entity + Clone>(change: &ResourceChange<T>, mut records: Vec<T>) -> (Vec<T>, i64) {
    let position = records.iter().position(|r| r.id() == change.id());
    match (change, position) {
        (ResourceChange::Created(next) | ResourceChange::Updated(next), Some(index)) => {
            records[index] = next.clone();
            (records, 0)
        }
        (ResourceChange::Created(next), None) => {
            records.insert(0, next.clone());
            (records, 1)
        }
        (ResourceChange::Updated(_), None) => (records, 0),
        (ResourceChange::Deleted(_), Some(index)) => {
            records.remove(index);
            (records, -1)
        }
        (ResourceChange::Deleted(_), None) => (records, 0),
    }
}

fn reduce_page<T: Entity + Clone>(
    change: &ResourceChange<T>,
    mut page: PaginatedResult<T>,
) -> PaginatedResult<T> {
    let present = page.data.iter().any(|r| r.id() == change.id());
    match change {
        // new records only show up at the top of the first page
        ResourceChange::Created(_) if !present && page.page_index > 0 => page,
        _ => {
            let (mut data, delta) = reduce_list(change, std::mem::take(&mut page.data));
            if page.page_size > 0 && data.len() > page.page_size as usize {
                data.truncate(page.page_size as usize);
            }
            page.data = data;
            page.total_size = page.total_size.saturating_add_signed(delta);
            page
        }
    }
}
