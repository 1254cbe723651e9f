//! Help page served at `/`.

pub const INDEX_PAGE: &str = r#"tasq
====

A basic, easy to use task queue service.
Items are ranked by how many times they were submitted;
the most requested item is consumed first.
----------------------------------------

PUT /:queue
    Add the request body to the queue. Adding an item that is
    already queued raises its priority by one.

    Example:
    curl -XPUT -d 'wowzers' http://localhost:8080/test
    {
        "ok": true,
        "payload": {
            "key": "test:wowzers"
        },
        "message": ""
    }


GET /:queue
    List up to 100 task keys, highest priority first, and the
    total number of items in the queue.

    Example:
    curl -XGET http://localhost:8080/test
    {
        "ok": true,
        "payload": {
            "tasks": ["test:wowzers"],
            "count": 1
        },
        "message": ""
    }


POST /:queue
    Consume the highest priority item. Once consumed, the item
    is removed from the queue. An empty queue answers 404.

    Example:
    curl -XPOST http://localhost:8080/test
    {
        "ok": true,
        "payload": {
            "key": "test:wowzers",
            "data": "wowzers"
        },
        "message": ""
    }
"#;
