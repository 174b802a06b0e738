use proc_macro::TokenStream;

mod db_context;

/// Derive macro for module persistence contexts
///
/// The struct must have exactly one `DatabaseFacade` field (or one field
/// marked `#[database]`). Any other field is initialized with `Default`.
/// The struct's name is the context type name the module label is derived
/// from, so `CatalogDbContext` becomes module `CATALOG`.
///
/// # Example
/// ```ignore
/// use modulith_db::DbContext;
/// use modulith_db::persistence::DatabaseFacade;
///
/// #[derive(DbContext)]
/// pub struct CatalogDbContext {
///     database: DatabaseFacade,
/// }
/// ```
#[proc_macro_derive(DbContext, attributes(database))]
pub fn derive_db_context(input: TokenStream) -> TokenStream {
    db_context::derive_db_context(input)
}
