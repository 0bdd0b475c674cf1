/*!
 * Data Structures
 *
 * Specialized data structures for pipeline operations:
 * - Inline strings for stack-allocated small strings
 *
 * # Performance
 *
 * - Inline strings: Avoids heap allocation for strings ≤23 bytes
 *
 * # Use Cases
 *
 * - **Inline strings**: Error types, frame function names, topic names
 */

mod inline_string;

pub use inline_string::InlineString;
