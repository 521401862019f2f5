pub mod mock_execution_server;

pub use mock_execution_server::{MockExecutionServer, MockReply};
