mod authz;

pub use authz::AuthzService;
