pub mod code_review;

pub use code_review::{
    install_code_review, register_nodes, review_state, CODE_REVIEW_GRAPH_ID,
    DEFAULT_MAX_LOOPS, DEFAULT_THRESHOLD,
};
