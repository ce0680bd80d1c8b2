mod employee_detail;
mod employee_list;

pub use employee_detail::EmployeeDetailView;
pub use employee_list::EmployeeListView;
