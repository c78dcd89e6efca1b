//! Generated gRPC bindings for the scheduler master node.

tonic::include_proto!("master");
